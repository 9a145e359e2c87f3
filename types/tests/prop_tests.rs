use proptest::prelude::*;

use govsync_types::{format_units, ProposalId, VoteTally, U256};

fn arb_u256() -> impl Strategy<Value = U256> {
    prop::array::uniform32(0u8..).prop_map(|bytes: [u8; 32]| U256::from_be_bytes(bytes))
}

proptest! {
    /// ProposalId display -> parse produces the identical id.
    #[test]
    fn proposal_id_decimal_roundtrip(raw in arb_u256()) {
        let id = ProposalId::new(raw);
        let parsed: ProposalId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// ProposalId JSON roundtrip keeps every bit.
    #[test]
    fn proposal_id_json_roundtrip(raw in arb_u256()) {
        let id = ProposalId::new(raw);
        let json = serde_json::to_string(&id).unwrap();
        let back: ProposalId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, id);
    }

    /// Removing the dot from a formatted amount and re-padding gives the raw value back.
    #[test]
    fn format_units_is_lossless(raw in arb_u256(), decimals in 0u8..=30) {
        let text = format_units(raw, decimals);
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w.to_string(), f.to_string()),
            None => (text.clone(), String::new()),
        };
        prop_assert!(frac.len() <= decimals as usize);
        let padded = format!("{whole}{frac:0<width$}", width = decimals as usize);
        prop_assert_eq!(U256::from_str_radix(&padded, 10).unwrap(), raw);
    }

    /// Tally JSON roundtrip is exact for arbitrary weights.
    #[test]
    fn tally_json_roundtrip(a in arb_u256(), b in arb_u256(), c in arb_u256()) {
        let tally = VoteTally::new(a, b, c);
        let json = serde_json::to_string(&tally).unwrap();
        let back: VoteTally = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, tally);
    }
}
