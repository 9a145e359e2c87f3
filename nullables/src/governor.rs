//! A simulated OpenZeppelin-style governor, votes token and timelock.
//!
//! The fixture emits the same logs a real deployment would and answers the
//! read calls the engine issues. Timepoint lookups (`quorum`,
//! `getPastTotalSupply`) revert for blocks at or after the head, as
//! checkpointed contracts do.

use crate::ledger::{fake_code, NullLedger};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use govsync_governance::abi::{IGovernor, ITimelock, IVotesToken};
use govsync_ledger::LedgerError;
use govsync_types::{ProposalId, ProposalState, VoteSupport};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

pub const GOVERNOR: Address = Address::new([0x60; 20]);
pub const TOKEN: Address = Address::new([0x70; 20]);
pub const TIMELOCK: Address = Address::new([0x80; 20]);
pub const MULTICALL: Address = Address::new([0xca; 20]);

#[derive(Clone, Debug)]
struct SimProposal {
    state: ProposalState,
    snapshot: u64,
    deadline: u64,
    against: U256,
    for_votes: U256,
    abstain: U256,
    eta: U256,
}

#[derive(Debug)]
struct SimState {
    proposals: BTreeMap<U256, SimProposal>,
    quorum: U256,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    delegates: HashMap<Address, Address>,
    votes: HashMap<Address, U256>,
    owner: Option<Address>,
    min_delay: U256,
    role_members: BTreeSet<(B256, Address)>,
}

/// Role hash the timelock uses for `name`.
pub fn role_hash(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

fn revert(reason: impl Into<String>) -> LedgerError {
    LedgerError::Reverted(reason.into())
}

fn encode<T: SolValue>(value: T) -> Result<Bytes, LedgerError> {
    Ok(Bytes::from((value,).abi_encode_params()))
}

fn selector(data: &[u8]) -> Result<[u8; 4], LedgerError> {
    data.get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| revert("call data shorter than a selector"))
}

fn decode<C: SolCall>(data: &[u8]) -> Result<C, LedgerError> {
    C::abi_decode(data, true).map_err(|e| revert(e.to_string()))
}

/// Handle to the simulated contracts deployed on a [`NullLedger`].
#[derive(Clone)]
pub struct SimulatedGovernor {
    ledger: Arc<NullLedger>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGovernor {
    /// Deploy governor, token, timelock and multicall at their fixed addresses.
    pub fn deploy(ledger: Arc<NullLedger>) -> Self {
        Self::deploy_with_owner(ledger, None)
    }

    /// Like [`SimulatedGovernor::deploy`], with an `Ownable` token.
    pub fn deploy_with_owner(ledger: Arc<NullLedger>, owner: Option<Address>) -> Self {
        let state = Arc::new(Mutex::new(SimState {
            proposals: BTreeMap::new(),
            quorum: U256::from(500u64),
            total_supply: U256::from(10_000u64),
            balances: HashMap::new(),
            delegates: HashMap::new(),
            votes: HashMap::new(),
            owner,
            min_delay: U256::from(172_800u64),
            role_members: BTreeSet::new(),
        }));

        ledger.deploy_multicall(MULTICALL);
        ledger.set_code(GOVERNOR, fake_code(&governor_selectors()));
        ledger.set_code(TIMELOCK, fake_code(&timelock_selectors()));
        let mut token_selectors = token_selectors();
        if owner.is_some() {
            token_selectors.push(IVotesToken::ownerCall::SELECTOR);
        }
        ledger.set_code(TOKEN, fake_code(&token_selectors));

        let sim = Self { ledger, state };
        sim.install_handlers();
        sim
    }

    pub fn ledger(&self) -> &Arc<NullLedger> {
        &self.ledger
    }

    fn install_handlers(&self) {
        let (state, ledger) = (self.state.clone(), self.ledger.clone());
        self.ledger.on_call(
            GOVERNOR,
            Box::new(move |data| governor_call(&state.lock().unwrap(), ledger.head(), data)),
        );
        let (state, ledger) = (self.state.clone(), self.ledger.clone());
        self.ledger.on_call(
            TOKEN,
            Box::new(move |data| token_call(&state.lock().unwrap(), ledger.head(), data)),
        );
        let state = self.state.clone();
        self.ledger.on_call(
            TIMELOCK,
            Box::new(move |data| timelock_call(&state.lock().unwrap(), data)),
        );
    }

    /// Emit `ProposalCreated` at `block` and register the proposal as pending.
    pub fn propose(&self, id: u64, proposer: Address, description: &str, block: u64, vote_start: u64, vote_end: u64) -> ProposalId {
        let proposal_id = U256::from(id);
        self.state.lock().unwrap().proposals.insert(
            proposal_id,
            SimProposal {
                state: ProposalState::Pending,
                snapshot: vote_start,
                deadline: vote_end,
                against: U256::ZERO,
                for_votes: U256::ZERO,
                abstain: U256::ZERO,
                eta: U256::ZERO,
            },
        );
        self.ledger.emit(
            GOVERNOR,
            &IGovernor::ProposalCreated {
                proposalId: proposal_id,
                proposer,
                targets: vec![TIMELOCK],
                values: vec![U256::ZERO],
                signatures: vec![String::new()],
                calldatas: vec![Bytes::from(
                    ITimelock::getMinDelayCall {}.abi_encode(),
                )],
                voteStart: U256::from(vote_start),
                voteEnd: U256::from(vote_end),
                description: description.to_string(),
            },
            block,
        );
        ProposalId::from(id)
    }

    /// Emit `VoteCast` and add the weight to the on-chain tally.
    pub fn cast_vote(&self, id: u64, voter: Address, support: VoteSupport, weight: u64, block: u64) -> B256 {
        self.cast_vote_with_reason(id, voter, support, weight, "", block)
    }

    pub fn cast_vote_with_reason(
        &self,
        id: u64,
        voter: Address,
        support: VoteSupport,
        weight: u64,
        reason: &str,
        block: u64,
    ) -> B256 {
        let raw_support = support.as_raw().unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            if let Some(p) = state.proposals.get_mut(&U256::from(id)) {
                let w = U256::from(weight);
                match support {
                    VoteSupport::For => p.for_votes += w,
                    VoteSupport::Against => p.against += w,
                    VoteSupport::Abstain => p.abstain += w,
                    VoteSupport::Comment => {}
                }
            }
        }
        self.ledger.emit(
            GOVERNOR,
            &IGovernor::VoteCast {
                voter,
                proposalId: U256::from(id),
                support: raw_support,
                weight: U256::from(weight),
                reason: reason.to_string(),
            },
            block,
        )
    }

    pub fn comment(&self, id: u64, member: Address, message: &str, block: u64) -> B256 {
        self.ledger.emit(
            GOVERNOR,
            &IGovernor::ProposalCommented {
                proposalId: U256::from(id),
                member,
                message: message.to_string(),
            },
            block,
        )
    }

    pub fn set_state(&self, id: u64, state: ProposalState) {
        if let Some(p) = self.state.lock().unwrap().proposals.get_mut(&U256::from(id)) {
            p.state = state;
        }
    }

    /// Queue a proposal: state, eta and the `ProposalQueued` log.
    pub fn queue(&self, id: u64, eta: u64, block: u64) {
        if let Some(p) = self.state.lock().unwrap().proposals.get_mut(&U256::from(id)) {
            p.state = ProposalState::Queued;
            p.eta = U256::from(eta);
        }
        self.ledger.emit(
            GOVERNOR,
            &IGovernor::ProposalQueued {
                proposalId: U256::from(id),
                etaSeconds: U256::from(eta),
            },
            block,
        );
    }

    pub fn execute(&self, id: u64, block: u64) {
        self.set_state(id, ProposalState::Executed);
        self.ledger.emit(
            GOVERNOR,
            &IGovernor::ProposalExecuted {
                proposalId: U256::from(id),
            },
            block,
        );
    }

    pub fn set_quorum(&self, quorum: u64) {
        self.state.lock().unwrap().quorum = U256::from(quorum);
    }

    pub fn set_balance(&self, account: Address, balance: u64) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(account, U256::from(balance));
    }

    /// Emit `DelegateChanged` and move the delegator's balance as votes.
    pub fn delegate(&self, delegator: Address, to: Address, block: u64) -> B256 {
        let from = {
            let mut state = self.state.lock().unwrap();
            let balance = state.balances.get(&delegator).copied().unwrap_or_default();
            let from = state.delegates.insert(delegator, to).unwrap_or_default();
            if from != Address::ZERO {
                let votes = state.votes.entry(from).or_default();
                *votes = votes.saturating_sub(balance);
            }
            *state.votes.entry(to).or_default() += balance;
            from
        };
        self.ledger.emit(
            TOKEN,
            &IVotesToken::DelegateChanged {
                delegator,
                fromDelegate: from,
                toDelegate: to,
            },
            block,
        )
    }

    pub fn grant_role(&self, role: &str, account: Address) {
        self.state
            .lock()
            .unwrap()
            .role_members
            .insert((role_hash(role), account));
    }
}

fn governor_selectors() -> Vec<[u8; 4]> {
    vec![
        IGovernor::stateCall::SELECTOR,
        IGovernor::proposalSnapshotCall::SELECTOR,
        IGovernor::proposalDeadlineCall::SELECTOR,
        IGovernor::proposalVotesCall::SELECTOR,
        IGovernor::proposalEtaCall::SELECTOR,
        IGovernor::quorumCall::SELECTOR,
        IGovernor::hashProposalCall::SELECTOR,
        IGovernor::castVoteCall::SELECTOR,
        IGovernor::tokenCall::SELECTOR,
        IGovernor::timelockCall::SELECTOR,
    ]
}

fn token_selectors() -> Vec<[u8; 4]> {
    vec![
        IVotesToken::nameCall::SELECTOR,
        IVotesToken::symbolCall::SELECTOR,
        IVotesToken::decimalsCall::SELECTOR,
        IVotesToken::totalSupplyCall::SELECTOR,
        IVotesToken::balanceOfCall::SELECTOR,
        IVotesToken::transferCall::SELECTOR,
        IVotesToken::allowanceCall::SELECTOR,
        IVotesToken::approveCall::SELECTOR,
        IVotesToken::transferFromCall::SELECTOR,
        IVotesToken::delegatesCall::SELECTOR,
        IVotesToken::getVotesCall::SELECTOR,
    ]
}

fn timelock_selectors() -> Vec<[u8; 4]> {
    vec![
        ITimelock::getMinDelayCall::SELECTOR,
        ITimelock::hashOperationCall::SELECTOR,
        ITimelock::scheduleCall::SELECTOR,
        ITimelock::executeCall::SELECTOR,
        ITimelock::hasRoleCall::SELECTOR,
    ]
}

fn proposal(state: &SimState, id: U256) -> Result<&SimProposal, LedgerError> {
    state
        .proposals
        .get(&id)
        .ok_or_else(|| revert("GovernorNonexistentProposal"))
}

fn past(timepoint: U256, head: u64) -> Result<(), LedgerError> {
    if timepoint >= U256::from(head) {
        return Err(revert("ERC5805FutureLookup"));
    }
    Ok(())
}

fn governor_call(state: &SimState, head: u64, data: &[u8]) -> Result<Bytes, LedgerError> {
    let s = selector(data)?;
    if s == IGovernor::stateCall::SELECTOR {
        let c = decode::<IGovernor::stateCall>(data)?;
        encode(U256::from(proposal(state, c.proposalId)?.state as u8))
    } else if s == IGovernor::proposalSnapshotCall::SELECTOR {
        let c = decode::<IGovernor::proposalSnapshotCall>(data)?;
        encode(U256::from(proposal(state, c.proposalId)?.snapshot))
    } else if s == IGovernor::proposalDeadlineCall::SELECTOR {
        let c = decode::<IGovernor::proposalDeadlineCall>(data)?;
        encode(U256::from(proposal(state, c.proposalId)?.deadline))
    } else if s == IGovernor::proposalEtaCall::SELECTOR {
        let c = decode::<IGovernor::proposalEtaCall>(data)?;
        encode(proposal(state, c.proposalId)?.eta)
    } else if s == IGovernor::proposalVotesCall::SELECTOR {
        let c = decode::<IGovernor::proposalVotesCall>(data)?;
        let p = proposal(state, c.proposalId)?;
        Ok(Bytes::from((p.against, p.for_votes, p.abstain).abi_encode_params()))
    } else if s == IGovernor::quorumCall::SELECTOR {
        let c = decode::<IGovernor::quorumCall>(data)?;
        past(c.timepoint, head)?;
        encode(state.quorum)
    } else if s == IGovernor::nameCall::SELECTOR {
        encode("Simulated Governor".to_string())
    } else if s == IGovernor::votingDelayCall::SELECTOR {
        encode(U256::from(1u64))
    } else if s == IGovernor::votingPeriodCall::SELECTOR {
        encode(U256::from(50_400u64))
    } else if s == IGovernor::proposalThresholdCall::SELECTOR {
        encode(U256::ZERO)
    } else if s == IGovernor::quorumNumeratorCall::SELECTOR {
        encode(U256::from(4u64))
    } else if s == IGovernor::COUNTING_MODECall::SELECTOR {
        encode("support=bravo&quorum=for,abstain".to_string())
    } else if s == IGovernor::tokenCall::SELECTOR {
        encode(TOKEN)
    } else if s == IGovernor::timelockCall::SELECTOR {
        encode(TIMELOCK)
    } else {
        Err(revert("governor: unknown selector"))
    }
}

fn token_call(state: &SimState, head: u64, data: &[u8]) -> Result<Bytes, LedgerError> {
    let s = selector(data)?;
    if s == IVotesToken::nameCall::SELECTOR {
        encode("Simulated Votes".to_string())
    } else if s == IVotesToken::symbolCall::SELECTOR {
        encode("SVT".to_string())
    } else if s == IVotesToken::decimalsCall::SELECTOR {
        encode(U256::from(18u8))
    } else if s == IVotesToken::totalSupplyCall::SELECTOR {
        encode(state.total_supply)
    } else if s == IVotesToken::balanceOfCall::SELECTOR {
        let c = decode::<IVotesToken::balanceOfCall>(data)?;
        encode(state.balances.get(&c.account).copied().unwrap_or_default())
    } else if s == IVotesToken::delegatesCall::SELECTOR {
        let c = decode::<IVotesToken::delegatesCall>(data)?;
        encode(state.delegates.get(&c.account).copied().unwrap_or_default())
    } else if s == IVotesToken::getVotesCall::SELECTOR {
        let c = decode::<IVotesToken::getVotesCall>(data)?;
        encode(state.votes.get(&c.account).copied().unwrap_or_default())
    } else if s == IVotesToken::getPastTotalSupplyCall::SELECTOR {
        let c = decode::<IVotesToken::getPastTotalSupplyCall>(data)?;
        past(c.timepoint, head)?;
        encode(state.total_supply)
    } else if s == IVotesToken::ownerCall::SELECTOR {
        state.owner.map_or_else(|| Err(revert("token: not ownable")), encode)
    } else {
        Err(revert("token: unknown selector"))
    }
}

fn timelock_call(state: &SimState, data: &[u8]) -> Result<Bytes, LedgerError> {
    let s = selector(data)?;
    if s == ITimelock::TIMELOCK_ADMIN_ROLECall::SELECTOR {
        encode(role_hash("TIMELOCK_ADMIN_ROLE"))
    } else if s == ITimelock::PROPOSER_ROLECall::SELECTOR {
        encode(role_hash("PROPOSER_ROLE"))
    } else if s == ITimelock::EXECUTOR_ROLECall::SELECTOR {
        encode(role_hash("EXECUTOR_ROLE"))
    } else if s == ITimelock::CANCELLER_ROLECall::SELECTOR {
        encode(role_hash("CANCELLER_ROLE"))
    } else if s == ITimelock::getMinDelayCall::SELECTOR {
        encode(state.min_delay)
    } else if s == ITimelock::hasRoleCall::SELECTOR {
        let c = decode::<ITimelock::hasRoleCall>(data)?;
        encode(state.role_members.contains(&(c.role, c.account)))
    } else {
        Err(revert("timelock: unknown selector"))
    }
}
