//! Quorum arithmetic.
//!
//! Weights are 18-decimal token amounts, so every ratio is computed as an exact
//! integer division in 512-bit space and rendered as truncated decimal text. No
//! floating point is involved, which keeps results reproducible across hosts.

use alloy_primitives::{U256, U512};
use govsync_types::{Proposal, VoteSupport};
use serde::{Deserialize, Serialize};

/// Fractional digits kept in percentages.
const PERCENT_DIGITS: u32 = 2;

/// Fractional digits kept in the support/quorum factor.
const FACTOR_DIGITS: u32 = 4;

/// How far a proposal's support has progressed towards its quorum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumWeight {
    /// Support has reached the quorum.
    pub success: bool,
    /// Support as a percentage of quorum, in `[0, 100]`.
    pub percent: String,
    pub support: U256,
    pub quorum: U256,
    /// `support / quorum`, in `[0, 1]`.
    pub factor: String,
}

impl QuorumWeight {
    fn zeroed(support: U256) -> Self {
        Self {
            success: false,
            percent: "0".to_string(),
            support,
            quorum: U256::ZERO,
            factor: "0".to_string(),
        }
    }

    fn reached(support: U256, quorum: U256) -> Self {
        Self {
            success: true,
            percent: "100".to_string(),
            support,
            quorum,
            factor: "1".to_string(),
        }
    }
}

/// The weight that counts towards quorum: for + abstain.
///
/// Uses the on-chain tally when known, otherwise the summed vote details.
pub fn quorum_support(proposal: &Proposal) -> U256 {
    match &proposal.tally {
        Some(tally) => tally.for_votes.saturating_add(tally.abstain_votes),
        None => proposal
            .detail_weight(VoteSupport::For)
            .saturating_add(proposal.detail_weight(VoteSupport::Abstain)),
    }
}

/// Progress of `proposal` towards its quorum, clamped to `[0, 100]` percent
/// and a `[0, 1]` factor.
///
/// A proposal whose quorum has not been fetched yet reports a zeroed result.
/// A zero quorum is trivially reached.
pub fn calc_quorum_weight(proposal: &Proposal) -> QuorumWeight {
    let support = quorum_support(proposal);
    let Some(quorum) = proposal.quorum else {
        return QuorumWeight::zeroed(support);
    };
    if quorum.is_zero() || support >= quorum {
        return QuorumWeight::reached(support, quorum);
    }
    QuorumWeight {
        success: false,
        percent: format_scaled(
            scaled_ratio(support, quorum, PERCENT_DIGITS + 2),
            PERCENT_DIGITS,
        ),
        support,
        quorum,
        factor: format_scaled(scaled_ratio(support, quorum, FACTOR_DIGITS), FACTOR_DIGITS),
    }
}

/// `votes_for / quorum * 100` as decimal text, truncated to two places.
///
/// Unlike [`calc_quorum_weight`] this has no upper clamp: a proposal at twice
/// its quorum reports `"200"`. A zero quorum reports `"0"`.
pub fn calc_quorum_state(quorum: U256, votes_for: U256) -> String {
    if quorum.is_zero() {
        return "0".to_string();
    }
    format_scaled(
        scaled_ratio(votes_for, quorum, PERCENT_DIGITS + 2),
        PERCENT_DIGITS,
    )
}

/// Recompute the derived quorum fields of `proposal` in place.
///
/// Leaves them untouched while the quorum itself is unknown.
pub fn apply_quorum(proposal: &mut Proposal) {
    if proposal.quorum.is_none() {
        return;
    }
    let weight = calc_quorum_weight(proposal);
    proposal.quorum_reached = Some(weight.success);
    proposal.quorum_percent = Some(weight.percent);
}

/// `num * 10^digits / den`, exact in 512 bits. `den` must be non-zero.
fn scaled_ratio(num: U256, den: U256, digits: u32) -> U512 {
    let scale = U512::from(10u64).pow(U512::from(digits));
    U512::from(num) * scale / U512::from(den)
}

/// Render a fixed-point integer with `digits` fractional digits, trimming
/// trailing zeros.
fn format_scaled(value: U512, digits: u32) -> String {
    let scale = U512::from(10u64).pow(U512::from(digits));
    let whole = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = digits as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use govsync_types::{ProposalId, VoteTally};

    fn proposal(for_votes: u64, against: u64, abstain: u64, quorum: Option<u64>) -> Proposal {
        let mut p = Proposal::new(ProposalId::from(1u64));
        p.tally = Some(VoteTally::new(
            U256::from(for_votes),
            U256::from(against),
            U256::from(abstain),
        ));
        p.quorum = quorum.map(U256::from);
        p
    }

    #[test]
    fn succeeded_proposal_clamps_at_one() {
        let w = calc_quorum_weight(&proposal(600, 100, 0, Some(500)));
        assert!(w.success);
        assert_eq!(w.percent, "100");
        assert_eq!(w.factor, "1");
        assert_eq!(w.support, U256::from(600u64));
        assert_eq!(w.quorum, U256::from(500u64));
    }

    #[test]
    fn against_votes_do_not_count_towards_quorum() {
        let w = calc_quorum_weight(&proposal(100, 900, 50, Some(600)));
        assert!(!w.success);
        assert_eq!(w.support, U256::from(150u64));
        assert_eq!(w.percent, "25");
        assert_eq!(w.factor, "0.25");
    }

    #[test]
    fn partial_support_truncates() {
        let w = calc_quorum_weight(&proposal(1, 0, 0, Some(3)));
        assert_eq!(w.percent, "33.33");
        assert_eq!(w.factor, "0.3333");
    }

    #[test]
    fn zero_quorum_is_trivially_reached() {
        let w = calc_quorum_weight(&proposal(0, 0, 0, Some(0)));
        assert!(w.success);
        assert_eq!(w.percent, "100");
        assert_eq!(w.factor, "1");
    }

    #[test]
    fn unknown_quorum_is_zeroed() {
        let w = calc_quorum_weight(&proposal(10, 0, 0, None));
        assert!(!w.success);
        assert_eq!(w.percent, "0");
        assert_eq!(w.factor, "0");
        assert_eq!(w.support, U256::from(10u64));
    }

    #[test]
    fn support_falls_back_to_vote_details() {
        use govsync_types::{Address, VoteDetail, B256};
        let mut p = Proposal::new(ProposalId::from(1u64));
        p.quorum = Some(U256::from(10u64));
        p.votes_for.push(VoteDetail {
            voter: Address::repeat_byte(1),
            support: VoteSupport::For,
            weight: U256::from(4u64),
            reason: None,
            block_number: 1,
            transaction_hash: B256::repeat_byte(1),
        });
        assert_eq!(calc_quorum_weight(&p).percent, "40");
    }

    #[test]
    fn huge_weights_do_not_overflow() {
        let mut p = proposal(0, 0, 0, None);
        p.tally = Some(VoteTally::new(U256::MAX - U256::from(1u8), U256::ZERO, U256::ZERO));
        p.quorum = Some(U256::MAX);
        let w = calc_quorum_weight(&p);
        assert!(!w.success);
        assert_eq!(w.percent, "99.99");
        assert_eq!(w.factor, "0.9999");
    }

    #[test]
    fn quorum_state_has_no_upper_clamp() {
        // Deliberately differs from calc_quorum_weight, which clamps at 100.
        assert_eq!(calc_quorum_state(U256::from(500u64), U256::from(1000u64)), "200");
        assert_eq!(calc_quorum_state(U256::from(500u64), U256::from(250u64)), "50");
        assert_eq!(calc_quorum_state(U256::ZERO, U256::from(1u8)), "0");
        let clamped = calc_quorum_weight(&proposal(1000, 0, 0, Some(500)));
        assert_eq!(clamped.percent, "100");
    }

    #[test]
    fn apply_quorum_sets_derived_fields_only_when_known() {
        let mut p = proposal(600, 100, 0, None);
        apply_quorum(&mut p);
        assert_eq!(p.quorum_reached, None);
        p.quorum = Some(U256::from(500u64));
        apply_quorum(&mut p);
        assert_eq!(p.quorum_reached, Some(true));
        assert_eq!(p.quorum_percent.as_deref(), Some("100"));
    }
}
