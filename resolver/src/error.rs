use govsync_governance::GovernanceError;
use govsync_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("failed to decode {signature} return data: {reason}")]
    Decode {
        signature: &'static str,
        reason: String,
    },

    /// The aggregator answered with a different number of results than calls.
    #[error("aggregate returned {actual} results for {expected} calls")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("expected a {expected} return value, got {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: String,
    },
}
