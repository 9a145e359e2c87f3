//! Merging deltas into proposal records.
//!
//! A proposal is never rebuilt from scratch once observed. Every refresh produces a
//! partial record which is folded into the previous one with [`merge_proposal`].
//! The fold is idempotent, so replaying the same delta is harmless.

use crate::decode::{CreatedLog, Lifecycle, LifecycleLog};
use crate::text::{description_hash, headline};
use govsync_types::{Comment, Proposal, VoteDetail, VoteSupport};

/// Fold `next` into `previous`.
///
/// - Scalar fields present in `next` override.
/// - Array fields from the created log override only when `next` carries them.
/// - Vote details and comments are appended, skipping transaction hashes already
///   present. Existing entries are never replaced.
/// - `quorum` and `quorum_reached` are taken from `next` only when `previous`
///   has none.
pub fn merge_proposal(previous: &Proposal, next: &Proposal) -> Proposal {
    let mut merged = previous.clone();

    override_some(&mut merged.state, &next.state);
    override_some(&mut merged.proposer, &next.proposer);
    override_some(&mut merged.snapshot, &next.snapshot);
    override_some(&mut merged.deadline, &next.deadline);
    override_some(&mut merged.eta, &next.eta);
    override_some(&mut merged.tally, &next.tally);
    override_some(&mut merged.total_supply, &next.total_supply);
    override_some(&mut merged.description, &next.description);
    override_some(&mut merged.description_hash, &next.description_hash);
    override_some(&mut merged.headline, &next.headline);
    override_some(&mut merged.canceled, &next.canceled);
    override_some(&mut merged.executed, &next.executed);
    override_some(&mut merged.transaction_hash, &next.transaction_hash);
    override_some(&mut merged.block_number, &next.block_number);

    override_non_empty(&mut merged.targets, &next.targets);
    override_non_empty(&mut merged.values, &next.values);
    override_non_empty(&mut merged.signatures, &next.signatures);
    override_non_empty(&mut merged.calldatas, &next.calldatas);

    for support in [VoteSupport::For, VoteSupport::Against, VoteSupport::Abstain] {
        for detail in next.vote_details(support) {
            add_vote(&mut merged, detail.clone());
        }
    }
    for comment in &next.comments {
        add_comment(&mut merged, comment.clone());
    }

    if merged.quorum.is_none() {
        merged.quorum = next.quorum;
    }
    if merged.quorum_reached.is_none() {
        merged.quorum_reached = next.quorum_reached;
        merged.quorum_percent = next.quorum_percent.clone();
    }

    merged
}

fn override_some<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

fn override_non_empty<T: Clone>(target: &mut Vec<T>, source: &[T]) {
    if !source.is_empty() {
        *target = source.to_vec();
    }
}

/// Append a vote to the bucket its support selects, unless a vote from the same
/// transaction is already recorded there. Returns whether it was inserted.
pub fn add_vote(proposal: &mut Proposal, detail: VoteDetail) -> bool {
    let Some(bucket) = proposal.vote_details_mut(detail.support) else {
        return false;
    };
    if bucket
        .iter()
        .any(|v| v.transaction_hash == detail.transaction_hash)
    {
        return false;
    }
    bucket.push(detail);
    true
}

/// Append a comment unless its transaction is already recorded.
pub fn add_comment(proposal: &mut Proposal, comment: Comment) -> bool {
    match proposal
        .comments
        .iter_mut()
        .find(|c| c.transaction_hash == comment.transaction_hash)
    {
        Some(existing) => {
            // Only a lazily resolved timestamp may be filled in later.
            if existing.timestamp.is_none() && comment.timestamp.is_some() {
                existing.timestamp = comment.timestamp;
            }
            false
        }
        None => {
            proposal.comments.push(comment);
            true
        }
    }
}

/// Lift the arguments of a created log onto `proposal`.
pub fn add_log_params_to_proposal(proposal: &mut Proposal, log: &CreatedLog) {
    proposal.proposer = Some(log.proposer);
    proposal.snapshot = Some(log.vote_start);
    proposal.deadline = Some(log.vote_end);
    proposal.targets = log.targets.clone();
    proposal.values = log.values.clone();
    proposal.signatures = log.signatures.clone();
    proposal.calldatas = log.calldatas.clone();
    proposal.description_hash = Some(description_hash(&log.description));
    proposal.headline = Some(headline(&log.description));
    proposal.description = Some(log.description.clone());
    proposal.transaction_hash = Some(log.transaction_hash);
    proposal.block_number = Some(log.block_number);
}

/// A fresh record for a proposal first seen through its created log.
pub fn proposal_from_created(log: &CreatedLog) -> Proposal {
    let mut proposal = Proposal::new(log.proposal_id);
    add_log_params_to_proposal(&mut proposal, log);
    proposal
}

/// Reflect a queue, cancel or execute log on `proposal`.
pub fn apply_lifecycle(proposal: &mut Proposal, log: &LifecycleLog) {
    match &log.change {
        Lifecycle::Queued { eta } => proposal.eta = Some(*eta),
        Lifecycle::Canceled => proposal.canceled = Some(true),
        Lifecycle::Executed => proposal.executed = Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256, U256};
    use govsync_types::{ProposalId, ProposalState, VoteTally};

    fn vote(support: VoteSupport, weight: u64, tx: u8) -> VoteDetail {
        VoteDetail {
            voter: Address::repeat_byte(tx),
            support,
            weight: U256::from(weight),
            reason: None,
            block_number: 100,
            transaction_hash: B256::repeat_byte(tx),
        }
    }

    fn comment(tx: u8, timestamp: Option<u64>) -> Comment {
        Comment {
            member: Address::repeat_byte(tx),
            proposal_id: ProposalId::from(1u64),
            message: format!("comment {tx}"),
            block_number: 50,
            timestamp,
            transaction_hash: B256::repeat_byte(tx),
        }
    }

    fn created() -> CreatedLog {
        CreatedLog {
            proposal_id: ProposalId::from(1u64),
            proposer: Address::repeat_byte(0xee),
            targets: vec![Address::repeat_byte(0x10)],
            values: vec![U256::ZERO],
            signatures: vec![String::new()],
            calldatas: vec![Bytes::from(vec![1u8, 2, 3])],
            vote_start: 110,
            vote_end: 200,
            description: "# Treasury top-up\nsend funds".to_string(),
            block_number: 100,
            transaction_hash: B256::repeat_byte(0xcc),
        }
    }

    #[test]
    fn log_params_derive_headline_and_hash() {
        let p = proposal_from_created(&created());
        assert_eq!(p.headline.as_deref(), Some("TREASURY TOP-UP"));
        assert_eq!(
            p.description_hash,
            Some(description_hash("# Treasury top-up\nsend funds"))
        );
        assert_eq!(p.snapshot, Some(110));
        assert_eq!(p.deadline, Some(200));
        assert_eq!(p.block_number, Some(100));
    }

    #[test]
    fn duplicate_vote_is_ignored() {
        let mut p = Proposal::new(ProposalId::from(1u64));
        assert!(add_vote(&mut p, vote(VoteSupport::For, 5, 1)));
        assert!(!add_vote(&mut p, vote(VoteSupport::For, 9, 1)));
        assert_eq!(p.votes_for.len(), 1);
        assert_eq!(p.votes_for[0].weight, U256::from(5u8));
        assert!(!add_vote(&mut p, vote(VoteSupport::Comment, 1, 2)));
    }

    #[test]
    fn merge_overrides_scalars_and_appends_votes() {
        let mut prev = proposal_from_created(&created());
        prev.state = Some(ProposalState::Pending);
        add_vote(&mut prev, vote(VoteSupport::For, 5, 1));

        let mut delta = Proposal::new(prev.id);
        delta.state = Some(ProposalState::Active);
        delta.tally = Some(VoteTally::new(U256::from(12u8), U256::ZERO, U256::ZERO));
        add_vote(&mut delta, vote(VoteSupport::For, 5, 1));
        add_vote(&mut delta, vote(VoteSupport::For, 7, 2));

        let merged = merge_proposal(&prev, &delta);
        assert_eq!(merged.state, Some(ProposalState::Active));
        assert_eq!(merged.votes_for.len(), 2);
        assert_eq!(merged.headline, prev.headline);
        assert_eq!(merged.targets, prev.targets);
        assert_eq!(merged.tally, delta.tally);
    }

    #[test]
    fn quorum_is_only_taken_when_missing() {
        let mut prev = Proposal::new(ProposalId::from(1u64));
        prev.quorum = Some(U256::from(500u64));
        prev.quorum_reached = Some(false);

        let mut delta = Proposal::new(prev.id);
        delta.quorum = Some(U256::from(900u64));
        delta.quorum_reached = Some(true);

        let merged = merge_proposal(&prev, &delta);
        assert_eq!(merged.quorum, Some(U256::from(500u64)));
        assert_eq!(merged.quorum_reached, Some(false));

        let merged = merge_proposal(&Proposal::new(prev.id), &delta);
        assert_eq!(merged.quorum, Some(U256::from(900u64)));
        assert_eq!(merged.quorum_reached, Some(true));
    }

    #[test]
    fn merge_is_idempotent() {
        let prev = proposal_from_created(&created());
        let mut delta = Proposal::new(prev.id);
        delta.eta = Some(U256::from(42u8));
        add_vote(&mut delta, vote(VoteSupport::Against, 3, 4));
        add_comment(&mut delta, comment(8, None));

        let once = merge_proposal(&prev, &delta);
        let twice = merge_proposal(&once, &delta);
        assert_eq!(once, twice);
    }

    #[test]
    fn comment_timestamp_fills_in_later() {
        let mut p = Proposal::new(ProposalId::from(1u64));
        assert!(add_comment(&mut p, comment(3, None)));
        assert!(!add_comment(&mut p, comment(3, Some(1_700_000_000))));
        assert_eq!(p.comments.len(), 1);
        assert_eq!(p.comments[0].timestamp, Some(1_700_000_000));
    }

    #[test]
    fn lifecycle_logs_set_flags() {
        let mut p = Proposal::new(ProposalId::from(1u64));
        let log = |change| LifecycleLog {
            proposal_id: ProposalId::from(1u64),
            change,
            block_number: 300,
            transaction_hash: B256::repeat_byte(9),
        };
        apply_lifecycle(&mut p, &log(Lifecycle::Queued { eta: U256::from(99u8) }));
        apply_lifecycle(&mut p, &log(Lifecycle::Executed));
        assert_eq!(p.eta, Some(U256::from(99u8)));
        assert_eq!(p.executed, Some(true));
        assert_eq!(p.canceled, None);
    }
}
