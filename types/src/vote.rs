//! Individual votes and comments lifted from event logs.

use crate::amount::decimal;
use crate::{ProposalId, VoteSupport};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// One vote cast on a proposal. Immutable once created.
///
/// Uniqueness within a proposal is by `transaction_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDetail {
    pub voter: Address,
    pub support: VoteSupport,
    #[serde(with = "decimal")]
    pub weight: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// A free-text comment posted against a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub member: Address,
    pub proposal_id: ProposalId,
    pub message: String,
    pub block_number: u64,
    /// Block timestamp (seconds), resolved lazily from the block header.
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub transaction_hash: B256,
}
