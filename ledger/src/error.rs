use thiserror::Error;

/// JSON-RPC error code several providers use for "query returned too much data".
pub const LIMIT_EXCEEDED_CODE: i64 = -32005;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The provider refused a log query because the block span or the result
    /// set was too large.
    #[error("log query exceeds provider limits: {0}")]
    LimitExceeded(String),

    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Whether this is the condition that should shrink the log window.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded(_))
    }

    /// Classify a JSON-RPC error object.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        if code == LIMIT_EXCEEDED_CODE
            || lower.contains("query returned more than")
            || lower.contains("block range")
            || lower.contains("too many blocks")
            || lower.contains("response size exceeded")
        {
            Self::LimitExceeded(message)
        } else if code == 3 || lower.contains("execution reverted") {
            Self::Reverted(message)
        } else if code == 429 || lower.contains("rate limit") {
            Self::RateLimited(message)
        } else {
            Self::Rpc { code, message }
        }
    }
}
