//! Proposal identifiers.

use crate::TypesError;
use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A governor proposal identifier.
///
/// On-chain this is a `uint256` (usually a hash of the proposal contents), far too
/// large for a float. It is displayed and serialized as a decimal string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId(U256);

impl ProposalId {
    pub fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<U256> for ProposalId {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl From<u64> for ProposalId {
    fn from(raw: u64) -> Self {
        Self(U256::from(raw))
    }
}

impl FromStr for ProposalId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str_radix(s.trim(), 10)
            .map(Self)
            .map_err(|_| TypesError::InvalidProposalId(s.to_string()))
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", self.0)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ProposalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
