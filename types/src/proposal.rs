//! The canonical proposal record.

use crate::amount::decimal;
use crate::{Comment, ProposalId, ProposalState, VoteDetail, VoteSupport, VoteTally};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A governance proposal as reconstructed from logs and contract reads.
///
/// A record is created the moment its "created" log is first observed, with most
/// fields still `None`, and is only ever superseded by merging newer deltas into it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    #[serde(default)]
    pub state: Option<ProposalState>,
    #[serde(default)]
    pub proposer: Option<Address>,
    /// Vote start (snapshot) block.
    #[serde(default)]
    pub snapshot: Option<u64>,
    /// Vote end block.
    #[serde(default)]
    pub deadline: Option<u64>,
    /// Execution eta once queued in the timelock.
    #[serde(default, with = "decimal::option")]
    pub eta: Option<U256>,
    #[serde(default)]
    pub tally: Option<VoteTally>,
    #[serde(default)]
    pub votes_for: Vec<VoteDetail>,
    #[serde(default)]
    pub votes_against: Vec<VoteDetail>,
    #[serde(default)]
    pub votes_abstain: Vec<VoteDetail>,
    #[serde(default, with = "decimal::option")]
    pub quorum: Option<U256>,
    #[serde(default)]
    pub quorum_reached: Option<bool>,
    /// Support as a percentage of quorum, clamped to `[0, 100]`.
    #[serde(default)]
    pub quorum_percent: Option<String>,
    /// Voting token supply at the snapshot block.
    #[serde(default, with = "decimal::option")]
    pub total_supply: Option<U256>,
    #[serde(default)]
    pub targets: Vec<Address>,
    #[serde(default, with = "decimal::vec")]
    pub values: Vec<U256>,
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub calldatas: Vec<Bytes>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_hash: Option<B256>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub canceled: Option<bool>,
    #[serde(default)]
    pub executed: Option<bool>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Transaction and block of the "created" log.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<u64>,
}

impl Proposal {
    /// An empty record carrying only its identifier.
    pub fn new(id: ProposalId) -> Self {
        Self {
            id,
            state: None,
            proposer: None,
            snapshot: None,
            deadline: None,
            eta: None,
            tally: None,
            votes_for: Vec::new(),
            votes_against: Vec::new(),
            votes_abstain: Vec::new(),
            quorum: None,
            quorum_reached: None,
            quorum_percent: None,
            total_supply: None,
            targets: Vec::new(),
            values: Vec::new(),
            signatures: Vec::new(),
            calldatas: Vec::new(),
            description: None,
            description_hash: None,
            headline: None,
            canceled: None,
            executed: None,
            comments: Vec::new(),
            transaction_hash: None,
            block_number: None,
        }
    }

    /// The vote-detail list for a support bucket. Comments have no list.
    pub fn vote_details(&self, support: VoteSupport) -> &[VoteDetail] {
        match support {
            VoteSupport::For => &self.votes_for,
            VoteSupport::Against => &self.votes_against,
            VoteSupport::Abstain => &self.votes_abstain,
            VoteSupport::Comment => &[],
        }
    }

    pub fn vote_details_mut(&mut self, support: VoteSupport) -> Option<&mut Vec<VoteDetail>> {
        match support {
            VoteSupport::For => Some(&mut self.votes_for),
            VoteSupport::Against => Some(&mut self.votes_against),
            VoteSupport::Abstain => Some(&mut self.votes_abstain),
            VoteSupport::Comment => None,
        }
    }

    /// Summed weight of the vote-detail list for `support`.
    pub fn detail_weight(&self, support: VoteSupport) -> U256 {
        self.vote_details(support)
            .iter()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(v.weight))
    }

    /// Number of individual votes recorded across all buckets.
    pub fn vote_count(&self) -> usize {
        self.votes_for.len() + self.votes_against.len() + self.votes_abstain.len()
    }

    /// Whether voting opened strictly before `head`, so timepoint lookups at the
    /// snapshot block are answerable. Unknown snapshots count as not started.
    pub fn is_started(&self, head: u64) -> bool {
        self.snapshot.is_some_and(|start| start < head)
    }
}
