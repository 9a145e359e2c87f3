use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot not found: {0}")]
    NotFound(String),

    #[error("snapshot i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot is corrupted: {0}")]
    Corruption(String),
}
