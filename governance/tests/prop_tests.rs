use proptest::prelude::*;

use alloy_primitives::{Address, B256, U256};
use govsync_governance::{add_comment, add_vote, calc_quorum_weight, merge_proposal};
use govsync_types::{Comment, Proposal, ProposalId, ProposalState, VoteDetail, VoteSupport, VoteTally};

fn arb_u256() -> impl Strategy<Value = U256> {
    prop::array::uniform32(0u8..).prop_map(|bytes: [u8; 32]| U256::from_be_bytes(bytes))
}

fn arb_support() -> impl Strategy<Value = VoteSupport> {
    prop_oneof![
        Just(VoteSupport::For),
        Just(VoteSupport::Against),
        Just(VoteSupport::Abstain),
    ]
}

/// Small tx-hash space so deltas collide with existing votes often.
fn arb_vote() -> impl Strategy<Value = VoteDetail> {
    (arb_support(), 0u64..1_000_000, 0u8..8, 0u64..500).prop_map(|(support, weight, tx, block)| {
        VoteDetail {
            voter: Address::repeat_byte(tx),
            support,
            weight: U256::from(weight),
            reason: None,
            block_number: block,
            transaction_hash: B256::repeat_byte(tx),
        }
    })
}

fn arb_comment() -> impl Strategy<Value = Comment> {
    (0u8..8, prop::option::of(0u64..2_000_000_000)).prop_map(|(tx, timestamp)| Comment {
        member: Address::repeat_byte(tx),
        proposal_id: ProposalId::from(1u64),
        message: format!("m{tx}"),
        block_number: 10,
        timestamp,
        transaction_hash: B256::repeat_byte(tx),
    })
}

fn arb_proposal() -> impl Strategy<Value = Proposal> {
    (
        prop::option::of(0u8..8),
        prop::option::of(0u64..1_000),
        prop::option::of(arb_u256()),
        prop::option::of((arb_u256(), arb_u256(), arb_u256())),
        prop::collection::vec(arb_vote(), 0..6),
        prop::collection::vec(arb_comment(), 0..4),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(state, snapshot, quorum, tally, votes, comments, reached)| {
            let mut p = Proposal::new(ProposalId::from(1u64));
            p.state = state.and_then(ProposalState::from_raw);
            p.snapshot = snapshot;
            p.quorum = quorum;
            p.quorum_reached = reached;
            p.tally = tally.map(|(f, a, ab)| VoteTally::new(f, a, ab));
            for v in votes {
                add_vote(&mut p, v);
            }
            for c in comments {
                add_comment(&mut p, c);
            }
            p
        })
}

proptest! {
    /// Merging the same delta twice equals merging it once.
    #[test]
    fn merge_is_idempotent(prev in arb_proposal(), delta in arb_proposal()) {
        let once = merge_proposal(&prev, &delta);
        let twice = merge_proposal(&once, &delta);
        prop_assert_eq!(once, twice);
    }

    /// Merging never drops a vote or lowers a bucket's total weight.
    #[test]
    fn merge_never_loses_weight(prev in arb_proposal(), delta in arb_proposal()) {
        let merged = merge_proposal(&prev, &delta);
        for support in [VoteSupport::For, VoteSupport::Against, VoteSupport::Abstain] {
            prop_assert!(merged.detail_weight(support) >= prev.detail_weight(support));
            prop_assert!(merged.vote_details(support).len() >= prev.vote_details(support).len());
        }
    }

    /// A vote list never holds the same transaction twice.
    #[test]
    fn vote_lists_stay_unique(prev in arb_proposal(), delta in arb_proposal()) {
        let merged = merge_proposal(&prev, &delta);
        for support in [VoteSupport::For, VoteSupport::Against, VoteSupport::Abstain] {
            let mut hashes: Vec<B256> =
                merged.vote_details(support).iter().map(|v| v.transaction_hash).collect();
            let before = hashes.len();
            hashes.sort();
            hashes.dedup();
            prop_assert_eq!(hashes.len(), before);
        }
    }

    /// Percent stays in [0, 100] and factor in [0, 1] for any weights, quorum 0 included.
    #[test]
    fn quorum_weight_is_clamped(
        for_votes in arb_u256(),
        against in arb_u256(),
        abstain in arb_u256(),
        quorum in prop_oneof![Just(U256::ZERO), arb_u256()],
    ) {
        let mut p = Proposal::new(ProposalId::from(1u64));
        p.tally = Some(VoteTally::new(for_votes, against, abstain));
        p.quorum = Some(quorum);
        let w = calc_quorum_weight(&p);

        let percent: f64 = w.percent.parse().unwrap();
        let factor: f64 = w.factor.parse().unwrap();
        prop_assert!((0.0..=100.0).contains(&percent), "percent {}", w.percent);
        prop_assert!((0.0..=1.0).contains(&factor), "factor {}", w.factor);
        prop_assert_eq!(w.success, quorum.is_zero() || w.support >= quorum);
    }
}
