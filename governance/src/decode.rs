//! Enum decoding and typed lifting of governance event logs.
//!
//! Every log the scanner indexes is decoded through [`GovernanceEvent::decode`],
//! which dispatches on `topic0` to the matching ABI event. There is no string
//! based lookup anywhere on this path.

use crate::abi::IGovernor;
use crate::error::GovernanceError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;
use govsync_ledger::RawLog;
use govsync_types::{Comment, EventKind, ProposalId, ProposalState, VoteDetail, VoteSupport};
use serde::{Deserialize, Serialize};

/// Decode the raw `state()` discriminant. Unknown values are an invariant
/// violation and always surface as an error.
pub fn decode_proposal_state(raw: u8) -> Result<ProposalState, GovernanceError> {
    ProposalState::from_raw(raw).ok_or(GovernanceError::UnknownProposalState(raw))
}

/// Decode the `support` byte of a vote event.
pub fn decode_vote_support(raw: u8) -> Result<VoteSupport, GovernanceError> {
    VoteSupport::from_raw(raw).ok_or(GovernanceError::UnknownVoteSupport(raw))
}

/// Narrow a block-height word to `u64`.
pub fn block_from_u256(value: U256) -> Result<u64, GovernanceError> {
    u64::try_from(value).map_err(|_| GovernanceError::Overflow {
        value: value.to_string(),
        target: "u64 block number",
    })
}

/// Arguments of a `ProposalCreated` log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedLog {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<U256>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<Bytes>,
    pub vote_start: u64,
    pub vote_end: u64,
    pub description: String,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// A status transition announced by the governor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Queued { eta: U256 },
    Canceled,
    Executed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleLog {
    pub proposal_id: ProposalId,
    pub change: Lifecycle,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// A decoded governance log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceEvent {
    Created(CreatedLog),
    Vote {
        proposal_id: ProposalId,
        detail: VoteDetail,
    },
    Comment(Comment),
    Lifecycle(LifecycleLog),
}

impl GovernanceEvent {
    /// The `topic0` values that make up one event kind.
    pub fn topics(kind: EventKind) -> Vec<B256> {
        match kind {
            EventKind::Created => vec![IGovernor::ProposalCreated::SIGNATURE_HASH],
            EventKind::Vote => vec![
                IGovernor::VoteCast::SIGNATURE_HASH,
                IGovernor::VoteCastWithParams::SIGNATURE_HASH,
            ],
            EventKind::Comment => vec![IGovernor::ProposalCommented::SIGNATURE_HASH],
            EventKind::Lifecycle => vec![
                IGovernor::ProposalQueued::SIGNATURE_HASH,
                IGovernor::ProposalCanceled::SIGNATURE_HASH,
                IGovernor::ProposalExecuted::SIGNATURE_HASH,
            ],
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created(_) => EventKind::Created,
            Self::Vote { .. } => EventKind::Vote,
            Self::Comment(_) => EventKind::Comment,
            Self::Lifecycle(_) => EventKind::Lifecycle,
        }
    }

    pub fn proposal_id(&self) -> ProposalId {
        match self {
            Self::Created(created) => created.proposal_id,
            Self::Vote { proposal_id, .. } => *proposal_id,
            Self::Comment(comment) => comment.proposal_id,
            Self::Lifecycle(change) => change.proposal_id,
        }
    }

    /// Decode a raw log by its `topic0`.
    pub fn decode(log: &RawLog) -> Result<Self, GovernanceError> {
        let topic0 = log
            .topics
            .first()
            .copied()
            .ok_or_else(|| GovernanceError::UnknownEvent("<no topics>".to_string()))?;

        if topic0 == IGovernor::ProposalCreated::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::ProposalCreated>(log, "ProposalCreated")?;
            Ok(Self::Created(CreatedLog {
                proposal_id: ev.proposalId.into(),
                proposer: ev.proposer,
                targets: ev.targets,
                values: ev.values,
                signatures: ev.signatures,
                calldatas: ev.calldatas,
                vote_start: block_from_u256(ev.voteStart)?,
                vote_end: block_from_u256(ev.voteEnd)?,
                description: ev.description,
                block_number: log.block_number,
                transaction_hash: log.transaction_hash,
            }))
        } else if topic0 == IGovernor::VoteCast::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::VoteCast>(log, "VoteCast")?;
            vote_event(log, ev.voter, ev.proposalId, ev.support, ev.weight, ev.reason)
        } else if topic0 == IGovernor::VoteCastWithParams::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::VoteCastWithParams>(log, "VoteCastWithParams")?;
            vote_event(log, ev.voter, ev.proposalId, ev.support, ev.weight, ev.reason)
        } else if topic0 == IGovernor::ProposalCommented::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::ProposalCommented>(log, "ProposalCommented")?;
            Ok(Self::Comment(Comment {
                member: ev.member,
                proposal_id: ev.proposalId.into(),
                message: ev.message,
                block_number: log.block_number,
                timestamp: None,
                transaction_hash: log.transaction_hash,
            }))
        } else if topic0 == IGovernor::ProposalQueued::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::ProposalQueued>(log, "ProposalQueued")?;
            Ok(lifecycle(log, ev.proposalId, Lifecycle::Queued { eta: ev.etaSeconds }))
        } else if topic0 == IGovernor::ProposalCanceled::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::ProposalCanceled>(log, "ProposalCanceled")?;
            Ok(lifecycle(log, ev.proposalId, Lifecycle::Canceled))
        } else if topic0 == IGovernor::ProposalExecuted::SIGNATURE_HASH {
            let ev = decode_event::<IGovernor::ProposalExecuted>(log, "ProposalExecuted")?;
            Ok(lifecycle(log, ev.proposalId, Lifecycle::Executed))
        } else {
            Err(GovernanceError::UnknownEvent(topic0.to_string()))
        }
    }
}

fn decode_event<E: SolEvent>(log: &RawLog, event: &'static str) -> Result<E, GovernanceError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data, true).map_err(|e| {
        GovernanceError::LogDecode {
            event,
            reason: e.to_string(),
        }
    })
}

fn vote_event(
    log: &RawLog,
    voter: Address,
    proposal_id: U256,
    support: u8,
    weight: U256,
    reason: String,
) -> Result<GovernanceEvent, GovernanceError> {
    Ok(GovernanceEvent::Vote {
        proposal_id: proposal_id.into(),
        detail: VoteDetail {
            voter,
            support: decode_vote_support(support)?,
            weight,
            reason: (!reason.is_empty()).then_some(reason),
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
        },
    })
}

fn lifecycle(log: &RawLog, proposal_id: U256, change: Lifecycle) -> GovernanceEvent {
    GovernanceEvent::Lifecycle(LifecycleLog {
        proposal_id: proposal_id.into(),
        change,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    })
}
