//! Pure governance helpers: the contract ABI, exact quorum arithmetic, log
//! decoding, proposal merging and bytecode sniffing.
//!
//! Nothing in this crate performs I/O. Everything is deterministic so that two
//! engines fed the same chain state produce identical boards.

pub mod abi;
pub mod bytecode;
pub mod decode;
pub mod delegation;
pub mod error;
pub mod proposal;
pub mod quorum;
pub mod text;

pub use bytecode::{detect_contract_kind, is_dao_registry, is_erc20, is_governor, is_timelock};
pub use decode::{
    block_from_u256, decode_proposal_state, decode_vote_support, CreatedLog, GovernanceEvent,
    Lifecycle, LifecycleLog,
};
pub use delegation::{decode_delegate_changed, DelegationBook, DELEGATE_CHANGED_TOPIC};
pub use error::GovernanceError;
pub use proposal::{
    add_comment, add_log_params_to_proposal, add_vote, apply_lifecycle, merge_proposal,
    proposal_from_created,
};
pub use quorum::{apply_quorum, calc_quorum_state, calc_quorum_weight, QuorumWeight};
pub use text::{description_hash, headline};
