use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    /// `state()` returned a discriminant outside the known lifecycle. The
    /// governor ABI makes this unreachable, so it is never swallowed.
    #[error("unknown proposal state discriminant {0}")]
    UnknownProposalState(u8),

    /// A vote log carried a support value outside against/for/abstain.
    #[error("unknown vote support value {0}")]
    UnknownVoteSupport(u8),

    #[error("failed to decode {event} log: {reason}")]
    LogDecode { event: &'static str, reason: String },

    #[error("log topic {0} is not a governance event")]
    UnknownEvent(String),

    #[error("value {value} does not fit in {target}")]
    Overflow { value: String, target: &'static str },
}
