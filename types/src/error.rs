//! Errors raised while parsing data-model values.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("invalid decimal integer: {0}")]
    InvalidDecimal(String),
}
