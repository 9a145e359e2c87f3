//! State enums for proposals, votes and governance events.

use serde::{Deserialize, Serialize};

/// The lifecycle status of a proposal, in on-chain discriminant order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl ProposalState {
    /// Map the raw `uint8` returned by `state(proposalId)`.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Pending,
            1 => Self::Active,
            2 => Self::Canceled,
            3 => Self::Defeated,
            4 => Self::Succeeded,
            5 => Self::Queued,
            6 => Self::Expired,
            7 => Self::Executed,
            _ => return None,
        })
    }

    /// Whether the proposal can still change state without a transaction
    /// (votes may still arrive).
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Whether no further state transition is possible.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Defeated | Self::Expired | Self::Executed
        )
    }
}

/// Which bucket a vote detail belongs to.
///
/// `Comment` never appears on-chain as a vote; it tags comment entries that are
/// presented alongside votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
    Comment,
}

impl VoteSupport {
    /// Map the raw `uint8 support` of a `VoteCast` event.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Against,
            1 => Self::For,
            2 => Self::Abstain,
            _ => return None,
        })
    }

    pub fn as_raw(&self) -> Option<u8> {
        match self {
            Self::Against => Some(0),
            Self::For => Some(1),
            Self::Abstain => Some(2),
            Self::Comment => None,
        }
    }
}

/// The governance event kinds the log scanner indexes, one map per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Vote,
    Comment,
    Lifecycle,
}
