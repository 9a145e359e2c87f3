//! Derived statistics exposed to callers.

use crate::ProposalId;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregates over the indexed governance events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceStats {
    pub unique_voters: BTreeSet<Address>,
    pub votes_per_voter: BTreeMap<Address, usize>,
    pub proposals_per_proposer: BTreeMap<Address, Vec<ProposalId>>,
    pub total_votes: usize,
    pub total_proposals: usize,
    pub total_comments: usize,
}

impl GovernanceStats {
    pub fn unique_voter_count(&self) -> usize {
        self.unique_voters.len()
    }

    pub fn unique_proposer_count(&self) -> usize {
        self.proposals_per_proposer.len()
    }
}

/// Ledger traffic counters since the engine was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStats {
    pub batched_calls: u64,
    pub single_calls: u64,
    pub log_queries: u64,
    pub code_queries: u64,
    pub block_queries: u64,
    pub fallbacks: u64,
    pub window_shrinks: u64,
}

impl ApiStats {
    /// Round trips issued to the ledger.
    pub fn total_requests(&self) -> u64 {
        self.batched_calls + self.single_calls + self.log_queries + self.code_queries
            + self.block_queries
    }
}
