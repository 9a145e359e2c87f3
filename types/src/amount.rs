//! Exact token weights and their human-readable rendering.
//!
//! Vote weights are 18-decimal token amounts. They are kept as raw `U256` units and
//! only ever converted to text, never to floating point.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Serde adapter: `U256` as a decimal string.
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10)
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal integer: {s}")))
    }

    /// Same as the parent module for `Option<U256>`.
    pub mod option {
        use alloy_primitives::U256;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<U256>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<U256>, D::Error> {
            let s: Option<String> = Option::deserialize(deserializer)?;
            s.map(|s| {
                U256::from_str_radix(&s, 10)
                    .map_err(|_| serde::de::Error::custom(format!("invalid decimal integer: {s}")))
            })
            .transpose()
        }
    }

    /// Same as the parent module for `Vec<U256>`.
    pub mod vec {
        use alloy_primitives::U256;
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for v in values {
                seq.serialize_element(&v.to_string())?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<U256>, D::Error> {
            let raw: Vec<String> = Vec::deserialize(deserializer)?;
            raw.iter()
                .map(|s| {
                    U256::from_str_radix(s, 10).map_err(|_| {
                        serde::de::Error::custom(format!("invalid decimal integer: {s}"))
                    })
                })
                .collect()
        }
    }
}

/// Render a raw token amount with `decimals` fractional digits.
///
/// Trailing zeros (and a trailing dot) are trimmed: `1500000000000000000` with 18
/// decimals renders as `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let unit = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / unit;
    let frac = value % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Exact on-chain vote tally as returned by `proposalVotes`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    #[serde(with = "decimal")]
    pub for_votes: U256,
    #[serde(with = "decimal")]
    pub against_votes: U256,
    #[serde(with = "decimal")]
    pub abstain_votes: U256,
}

/// A tally normalized by the voting token's decimals, for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTally {
    pub for_votes: String,
    pub against_votes: String,
    pub abstain_votes: String,
}

impl VoteTally {
    pub fn new(for_votes: U256, against_votes: U256, abstain_votes: U256) -> Self {
        Self {
            for_votes,
            against_votes,
            abstain_votes,
        }
    }

    /// Sum of all three buckets, saturating at `U256::MAX`.
    pub fn total(&self) -> U256 {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    pub fn formatted(&self, decimals: u8) -> FormattedTally {
        FormattedTally {
            for_votes: format_units(self.for_votes, decimals),
            against_votes: format_units(self.against_votes, decimals),
            abstain_votes: format_units(self.abstain_votes, decimals),
        }
    }
}
