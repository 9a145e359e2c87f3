//! The closed set of read calls the resolver knows how to encode and decode.
//!
//! Each variant maps to exactly one ABI function. Encoding, decoding and the
//! human-readable signature are resolved by `match`, never by method name.

use crate::error::ResolverError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use govsync_governance::abi::{IGovernor, IMulticall, ITimelock, IVotesToken};
use govsync_types::{ProposalId, VoteTally};

/// One read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadCall {
    GovernorName,
    State(ProposalId),
    ProposalSnapshot(ProposalId),
    ProposalDeadline(ProposalId),
    ProposalEta(ProposalId),
    ProposalVotes(ProposalId),
    Quorum(u64),
    VotingDelay,
    VotingPeriod,
    ProposalThreshold,
    QuorumNumerator,
    CountingMode,
    Token,
    Timelock,

    TokenName,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf(Address),
    Delegates(Address),
    GetVotes(Address),
    PastTotalSupply(u64),
    Owner,

    AdminRole,
    ProposerRole,
    ExecutorRole,
    CancellerRole,
    MinDelay,
    HasRole { role: B256, account: Address },

    /// Native balance, served by the aggregator contract itself.
    EthBalance(Address),
}

/// A decoded return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallValue {
    Uint(U256),
    Small(u8),
    Bool(bool),
    Address(Address),
    Hash(B256),
    Text(String),
    Votes(VoteTally),
}

impl CallValue {
    pub fn as_u256(&self) -> Result<U256, ResolverError> {
        match self {
            Self::Uint(v) => Ok(*v),
            other => Err(unexpected(other, "uint256")),
        }
    }

    pub fn as_u8(&self) -> Result<u8, ResolverError> {
        match self {
            Self::Small(v) => Ok(*v),
            other => Err(unexpected(other, "uint8")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ResolverError> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(unexpected(other, "bool")),
        }
    }

    pub fn as_address(&self) -> Result<Address, ResolverError> {
        match self {
            Self::Address(v) => Ok(*v),
            other => Err(unexpected(other, "address")),
        }
    }

    pub fn as_hash(&self) -> Result<B256, ResolverError> {
        match self {
            Self::Hash(v) => Ok(*v),
            other => Err(unexpected(other, "bytes32")),
        }
    }

    pub fn as_text(&self) -> Result<&str, ResolverError> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(unexpected(other, "string")),
        }
    }

    pub fn as_votes(&self) -> Result<VoteTally, ResolverError> {
        match self {
            Self::Votes(v) => Ok(v.clone()),
            other => Err(unexpected(other, "proposal votes")),
        }
    }
}

fn unexpected(value: &CallValue, expected: &'static str) -> ResolverError {
    ResolverError::UnexpectedValue {
        expected,
        found: format!("{value:?}"),
    }
}

fn returns<C: SolCall>(data: &[u8]) -> Result<C::Return, ResolverError> {
    C::abi_decode_returns(data, true).map_err(|e| ResolverError::Decode {
        signature: C::SIGNATURE,
        reason: e.to_string(),
    })
}

impl ReadCall {
    /// ABI-encoded call data, selector included.
    pub fn encode(&self) -> Bytes {
        let raw = match self {
            Self::GovernorName => IGovernor::nameCall {}.abi_encode(),
            Self::State(id) => IGovernor::stateCall { proposalId: id.as_u256() }.abi_encode(),
            Self::ProposalSnapshot(id) => {
                IGovernor::proposalSnapshotCall { proposalId: id.as_u256() }.abi_encode()
            }
            Self::ProposalDeadline(id) => {
                IGovernor::proposalDeadlineCall { proposalId: id.as_u256() }.abi_encode()
            }
            Self::ProposalEta(id) => IGovernor::proposalEtaCall { proposalId: id.as_u256() }.abi_encode(),
            Self::ProposalVotes(id) => {
                IGovernor::proposalVotesCall { proposalId: id.as_u256() }.abi_encode()
            }
            Self::Quorum(block) => IGovernor::quorumCall { timepoint: U256::from(*block) }.abi_encode(),
            Self::VotingDelay => IGovernor::votingDelayCall {}.abi_encode(),
            Self::VotingPeriod => IGovernor::votingPeriodCall {}.abi_encode(),
            Self::ProposalThreshold => IGovernor::proposalThresholdCall {}.abi_encode(),
            Self::QuorumNumerator => IGovernor::quorumNumeratorCall {}.abi_encode(),
            Self::CountingMode => IGovernor::COUNTING_MODECall {}.abi_encode(),
            Self::Token => IGovernor::tokenCall {}.abi_encode(),
            Self::Timelock => IGovernor::timelockCall {}.abi_encode(),

            Self::TokenName => IVotesToken::nameCall {}.abi_encode(),
            Self::Symbol => IVotesToken::symbolCall {}.abi_encode(),
            Self::Decimals => IVotesToken::decimalsCall {}.abi_encode(),
            Self::TotalSupply => IVotesToken::totalSupplyCall {}.abi_encode(),
            Self::BalanceOf(account) => IVotesToken::balanceOfCall { account: *account }.abi_encode(),
            Self::Delegates(account) => IVotesToken::delegatesCall { account: *account }.abi_encode(),
            Self::GetVotes(account) => IVotesToken::getVotesCall { account: *account }.abi_encode(),
            Self::PastTotalSupply(block) => IVotesToken::getPastTotalSupplyCall {
                timepoint: U256::from(*block),
            }
            .abi_encode(),
            Self::Owner => IVotesToken::ownerCall {}.abi_encode(),

            Self::AdminRole => ITimelock::TIMELOCK_ADMIN_ROLECall {}.abi_encode(),
            Self::ProposerRole => ITimelock::PROPOSER_ROLECall {}.abi_encode(),
            Self::ExecutorRole => ITimelock::EXECUTOR_ROLECall {}.abi_encode(),
            Self::CancellerRole => ITimelock::CANCELLER_ROLECall {}.abi_encode(),
            Self::MinDelay => ITimelock::getMinDelayCall {}.abi_encode(),
            Self::HasRole { role, account } => ITimelock::hasRoleCall {
                role: *role,
                account: *account,
            }
            .abi_encode(),

            Self::EthBalance(addr) => IMulticall::getEthBalanceCall { addr: *addr }.abi_encode(),
        };
        Bytes::from(raw)
    }

    /// Decode the raw return data of this call.
    pub fn decode(&self, data: &[u8]) -> Result<CallValue, ResolverError> {
        Ok(match self {
            Self::GovernorName => CallValue::Text(returns::<IGovernor::nameCall>(data)?._0),
            Self::State(_) => CallValue::Small(returns::<IGovernor::stateCall>(data)?._0),
            Self::ProposalSnapshot(_) => CallValue::Uint(returns::<IGovernor::proposalSnapshotCall>(data)?._0),
            Self::ProposalDeadline(_) => CallValue::Uint(returns::<IGovernor::proposalDeadlineCall>(data)?._0),
            Self::ProposalEta(_) => CallValue::Uint(returns::<IGovernor::proposalEtaCall>(data)?._0),
            Self::ProposalVotes(_) => {
                let r = returns::<IGovernor::proposalVotesCall>(data)?;
                CallValue::Votes(VoteTally::new(r.forVotes, r.againstVotes, r.abstainVotes))
            }
            Self::Quorum(_) => CallValue::Uint(returns::<IGovernor::quorumCall>(data)?._0),
            Self::VotingDelay => CallValue::Uint(returns::<IGovernor::votingDelayCall>(data)?._0),
            Self::VotingPeriod => CallValue::Uint(returns::<IGovernor::votingPeriodCall>(data)?._0),
            Self::ProposalThreshold => CallValue::Uint(returns::<IGovernor::proposalThresholdCall>(data)?._0),
            Self::QuorumNumerator => CallValue::Uint(returns::<IGovernor::quorumNumeratorCall>(data)?._0),
            Self::CountingMode => CallValue::Text(returns::<IGovernor::COUNTING_MODECall>(data)?._0),
            Self::Token => CallValue::Address(returns::<IGovernor::tokenCall>(data)?._0),
            Self::Timelock => CallValue::Address(returns::<IGovernor::timelockCall>(data)?._0),

            Self::TokenName => CallValue::Text(returns::<IVotesToken::nameCall>(data)?._0),
            Self::Symbol => CallValue::Text(returns::<IVotesToken::symbolCall>(data)?._0),
            Self::Decimals => CallValue::Small(returns::<IVotesToken::decimalsCall>(data)?._0),
            Self::TotalSupply => CallValue::Uint(returns::<IVotesToken::totalSupplyCall>(data)?._0),
            Self::BalanceOf(_) => CallValue::Uint(returns::<IVotesToken::balanceOfCall>(data)?._0),
            Self::Delegates(_) => CallValue::Address(returns::<IVotesToken::delegatesCall>(data)?._0),
            Self::GetVotes(_) => CallValue::Uint(returns::<IVotesToken::getVotesCall>(data)?._0),
            Self::PastTotalSupply(_) => CallValue::Uint(returns::<IVotesToken::getPastTotalSupplyCall>(data)?._0),
            Self::Owner => CallValue::Address(returns::<IVotesToken::ownerCall>(data)?._0),

            Self::AdminRole => CallValue::Hash(returns::<ITimelock::TIMELOCK_ADMIN_ROLECall>(data)?._0),
            Self::ProposerRole => CallValue::Hash(returns::<ITimelock::PROPOSER_ROLECall>(data)?._0),
            Self::ExecutorRole => CallValue::Hash(returns::<ITimelock::EXECUTOR_ROLECall>(data)?._0),
            Self::CancellerRole => CallValue::Hash(returns::<ITimelock::CANCELLER_ROLECall>(data)?._0),
            Self::MinDelay => CallValue::Uint(returns::<ITimelock::getMinDelayCall>(data)?._0),
            Self::HasRole { .. } => CallValue::Bool(returns::<ITimelock::hasRoleCall>(data)?._0),

            Self::EthBalance(_) => CallValue::Uint(returns::<IMulticall::getEthBalanceCall>(data)?.balance),
        })
    }

    /// Canonical Solidity signature, e.g. `state(uint256)`.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::GovernorName => IGovernor::nameCall::SIGNATURE,
            Self::State(_) => IGovernor::stateCall::SIGNATURE,
            Self::ProposalSnapshot(_) => IGovernor::proposalSnapshotCall::SIGNATURE,
            Self::ProposalDeadline(_) => IGovernor::proposalDeadlineCall::SIGNATURE,
            Self::ProposalEta(_) => IGovernor::proposalEtaCall::SIGNATURE,
            Self::ProposalVotes(_) => IGovernor::proposalVotesCall::SIGNATURE,
            Self::Quorum(_) => IGovernor::quorumCall::SIGNATURE,
            Self::VotingDelay => IGovernor::votingDelayCall::SIGNATURE,
            Self::VotingPeriod => IGovernor::votingPeriodCall::SIGNATURE,
            Self::ProposalThreshold => IGovernor::proposalThresholdCall::SIGNATURE,
            Self::QuorumNumerator => IGovernor::quorumNumeratorCall::SIGNATURE,
            Self::CountingMode => IGovernor::COUNTING_MODECall::SIGNATURE,
            Self::Token => IGovernor::tokenCall::SIGNATURE,
            Self::Timelock => IGovernor::timelockCall::SIGNATURE,
            Self::TokenName => IVotesToken::nameCall::SIGNATURE,
            Self::Symbol => IVotesToken::symbolCall::SIGNATURE,
            Self::Decimals => IVotesToken::decimalsCall::SIGNATURE,
            Self::TotalSupply => IVotesToken::totalSupplyCall::SIGNATURE,
            Self::BalanceOf(_) => IVotesToken::balanceOfCall::SIGNATURE,
            Self::Delegates(_) => IVotesToken::delegatesCall::SIGNATURE,
            Self::GetVotes(_) => IVotesToken::getVotesCall::SIGNATURE,
            Self::PastTotalSupply(_) => IVotesToken::getPastTotalSupplyCall::SIGNATURE,
            Self::Owner => IVotesToken::ownerCall::SIGNATURE,
            Self::AdminRole => ITimelock::TIMELOCK_ADMIN_ROLECall::SIGNATURE,
            Self::ProposerRole => ITimelock::PROPOSER_ROLECall::SIGNATURE,
            Self::ExecutorRole => ITimelock::EXECUTOR_ROLECall::SIGNATURE,
            Self::CancellerRole => ITimelock::CANCELLER_ROLECall::SIGNATURE,
            Self::MinDelay => ITimelock::getMinDelayCall::SIGNATURE,
            Self::HasRole { .. } => ITimelock::hasRoleCall::SIGNATURE,
            Self::EthBalance(_) => IMulticall::getEthBalanceCall::SIGNATURE,
        }
    }
}
