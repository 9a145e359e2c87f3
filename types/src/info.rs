//! Point-in-time snapshots of governor, timelock and token configuration.
//!
//! None of these have append-only history; a refresh replaces the whole value.

use crate::amount::decimal;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorInformation {
    pub address: Address,
    pub name: String,
    #[serde(with = "decimal")]
    pub voting_delay: U256,
    #[serde(with = "decimal")]
    pub voting_period: U256,
    #[serde(with = "decimal")]
    pub proposal_threshold: U256,
    #[serde(with = "decimal")]
    pub quorum_numerator: U256,
    /// e.g. `support=bravo&quorum=for,abstain`
    pub counting_mode: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockInformation {
    pub address: Address,
    pub admin_role: B256,
    pub proposer_role: B256,
    pub executor_role: B256,
    pub canceller_role: B256,
    #[serde(with = "decimal")]
    pub min_delay: U256,
}

impl TimelockInformation {
    /// The four role hashes in the fixed order used by role checks.
    pub fn roles(&self) -> [B256; 4] {
        [
            self.admin_role,
            self.proposer_role,
            self.executor_role,
            self.canceller_role,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInformation {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(with = "decimal")]
    pub total_supply: U256,
    /// Only present when the token's bytecode exposes `owner()`.
    #[serde(default)]
    pub owner: Option<Address>,
    /// Accounts that have activated voting power, when delegations were scanned.
    #[serde(default)]
    pub members: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationInformation {
    pub account: Address,
    pub delegate: Address,
    #[serde(with = "decimal")]
    pub balance: U256,
    #[serde(with = "decimal")]
    pub votes: U256,
    #[serde(with = "decimal")]
    pub total_supply: U256,
}

impl DelegationInformation {
    pub fn has_delegated(&self) -> bool {
        self.delegate != Address::ZERO
    }

    pub fn is_self_delegated(&self) -> bool {
        self.delegate == self.account
    }
}

/// Timelock role membership of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoles {
    pub account: Address,
    pub admin: bool,
    pub proposer: bool,
    pub executor: bool,
    pub canceller: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryBalance {
    /// `None` for the chain's native currency.
    pub token: Option<Address>,
    #[serde(with = "decimal")]
    pub balance: U256,
}

/// The latest delegation choice of one token holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegator {
    pub delegator: Address,
    pub delegate: Address,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// Addresses of the contracts the engine reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub governor: Address,
    #[serde(default)]
    pub token: Option<Address>,
    #[serde(default)]
    pub timelock: Option<Address>,
    pub multicall: Address,
}

/// Result of bytecode sniffing. A heuristic, not a proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Governor,
    Timelock,
    Erc20,
    DaoRegistry,
    Unknown,
}
