//! The read-only ledger interface the synchronization engine depends on.
//!
//! Everything the engine knows about the chain comes through [`LedgerReader`].
//! Implementations own transport, timeouts and retries; the engine owns none
//! of those.

use crate::LedgerError;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block reference: a height or a block hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockId {
    Number(u64),
    Hash(B256),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "#{n}"),
            Self::Hash(h) => write!(f, "{h}"),
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<B256> for BlockId {
    fn from(h: B256) -> Self {
        Self::Hash(h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
}

/// A single-topic log query over an inclusive block range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    /// Event signature hash (topic 0).
    pub topic: B256,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    pub fn new(address: Address, topic: B256) -> Self {
        Self {
            address,
            topic,
            from_block: 0,
            to_block: 0,
        }
    }

    /// The same filter restricted to `[from, to]`.
    pub fn range(&self, from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            ..*self
        }
    }
}

/// An undecoded event log as returned by the ledger, in chain order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl RawLog {
    /// Chain position used for ordering.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Read-only access to the ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Current head height.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Deployed bytecode at `address` (empty for accounts without code).
    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError>;

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError>;

    /// Logs matching `filter`, ordered by block then log index.
    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError>;
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for std::sync::Arc<T> {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        (**self).block_number().await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        (**self).get_code(address).await
    }

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError> {
        (**self).get_block(id).await
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        (**self).query_logs(filter).await
    }

    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        (**self).call(target, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_keeps_address_and_topic() {
        let base = LogFilter::new(Address::repeat_byte(1), B256::repeat_byte(2));
        let ranged = base.range(10, 20);
        assert_eq!(ranged.address, base.address);
        assert_eq!(ranged.topic, base.topic);
        assert_eq!((ranged.from_block, ranged.to_block), (10, 20));
    }

    #[test]
    fn block_id_display() {
        assert_eq!(BlockId::Number(7).to_string(), "#7");
        assert!(BlockId::Hash(B256::ZERO).to_string().starts_with("0x"));
    }
}
