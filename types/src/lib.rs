//! Data model for governance synchronization.
//!
//! This crate defines the records shared across every other crate in the workspace:
//! proposal identifiers, proposals and their vote details, comments, point-in-time
//! contract snapshots, and the derived statistics structures.
//!
//! Exact on-chain integers are carried as [`U256`] and serialized as decimal strings
//! so cached snapshots round-trip without precision loss.

pub mod amount;
pub mod error;
pub mod id;
pub mod info;
pub mod proposal;
pub mod state;
pub mod stats;
pub mod vote;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use amount::{format_units, FormattedTally, VoteTally};
pub use error::TypesError;
pub use id::ProposalId;
pub use info::{
    ContractAddresses, ContractKind, DelegationInformation, Delegator, GovernorInformation,
    TimelockInformation, TokenInformation, TreasuryBalance, UserRoles,
};
pub use proposal::Proposal;
pub use state::{EventKind, ProposalState, VoteSupport};
pub use stats::{ApiStats, GovernanceStats};
pub use vote::{Comment, VoteDetail};
