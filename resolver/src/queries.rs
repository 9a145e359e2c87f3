//! Composite queries assembled from batched reads.
//!
//! Every query is first planned as a flat list of `(target, ReadCall)` pairs and
//! then executed either through one aggregate call or, when that fails, as one
//! `eth_call` per entry in sequence. Both paths feed the same assembler, so a
//! fallback produces exactly what the batched path would have.

use crate::batch::{fetch_single, BatchResolver};
use crate::call::{CallValue, ReadCall};
use crate::error::ResolverError;
use alloy_primitives::{Address, U256};
use govsync_governance::{block_from_u256, bytecode, decode_proposal_state};
use govsync_ledger::LedgerReader;
use govsync_types::{
    DelegationInformation, GovernorInformation, Proposal, ProposalId, TimelockInformation,
    TokenInformation, TreasuryBalance, UserRoles,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fields read per started proposal during a board rebuild.
pub const BOARD_FIELDS: usize = 5;

/// Fixed fields of a single-proposal refresh.
pub const REFRESH_FIELDS: usize = 5;

/// Notified whenever a batched query is re-run call by call.
pub trait FallbackObserver: Send + Sync {
    fn on_fallback(&self, query: &'static str, error: &ResolverError);
}

struct Silent;

impl FallbackObserver for Silent {
    fn on_fallback(&self, _query: &'static str, _error: &ResolverError) {}
}

/// How a plan is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One aggregate call, falling back to [`Mode::Single`] on failure.
    Batched,
    /// One call per entry, sequentially.
    Single,
}

type Plan = Vec<(Address, ReadCall)>;

/// Typed queries over a [`LedgerReader`] and a Multicall aggregator.
pub struct Resolver<R> {
    reader: R,
    multicall: Address,
    observer: Arc<dyn FallbackObserver>,
}

impl<R: LedgerReader> Resolver<R> {
    pub fn new(reader: R, multicall: Address) -> Self {
        Self {
            reader,
            multicall,
            observer: Arc::new(Silent),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn FallbackObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn multicall(&self) -> Address {
        self.multicall
    }

    pub fn set_multicall(&mut self, multicall: Address) {
        self.multicall = multicall;
    }

    /// Run `plan` as one aggregate call. No fallback.
    pub async fn execute_batched(&self, plan: &[(Address, ReadCall)]) -> Result<Vec<CallValue>, ResolverError> {
        let mut batch = BatchResolver::new(self.multicall);
        for (target, call) in plan {
            batch.add_operation(*target, call.clone());
        }
        Ok(batch
            .aggregate(&self.reader)
            .await?
            .into_iter()
            .map(|r| r.value)
            .collect())
    }

    /// Run `plan` one call at a time.
    pub async fn execute_single(&self, plan: &[(Address, ReadCall)]) -> Result<Vec<CallValue>, ResolverError> {
        let mut values = Vec::with_capacity(plan.len());
        for (target, call) in plan {
            values.push(fetch_single(&self.reader, *target, call).await?);
        }
        Ok(values)
    }

    /// Run `plan` per `mode`, falling back from batched to single on any error.
    pub async fn execute(
        &self,
        query: &'static str,
        plan: &[(Address, ReadCall)],
        mode: Mode,
    ) -> Result<Vec<CallValue>, ResolverError> {
        if mode == Mode::Single {
            return self.execute_single(plan).await;
        }
        match self.execute_batched(plan).await {
            Ok(values) => Ok(values),
            Err(err) => {
                warn!(query, error = %err, calls = plan.len(), "aggregate failed, falling back to single calls");
                self.observer.on_fallback(query, &err);
                self.execute_single(plan).await
            }
        }
    }

    /// Signal a fallback decided by a caller outside this type.
    pub fn report_fallback(&self, query: &'static str, error: &ResolverError) {
        self.observer.on_fallback(query, error);
    }

    /// Token metadata. `owner()` is read only when the bytecode exposes it.
    pub async fn token_info(&self, token: Address) -> Result<TokenInformation, ResolverError> {
        let code = self.reader.get_code(token).await?;
        let with_owner = bytecode::has_owner(&code);

        let mut plan: Plan = vec![
            (token, ReadCall::TokenName),
            (token, ReadCall::Symbol),
            (token, ReadCall::Decimals),
            (token, ReadCall::TotalSupply),
        ];
        if with_owner {
            plan.push((token, ReadCall::Owner));
        }
        let v = self.execute("token_info", &plan, Mode::Batched).await?;

        Ok(TokenInformation {
            address: token,
            name: v[0].as_text()?.to_string(),
            symbol: v[1].as_text()?.to_string(),
            decimals: v[2].as_u8()?,
            total_supply: v[3].as_u256()?,
            owner: v.get(4).map(CallValue::as_address).transpose()?,
            members: None,
        })
    }

    /// The four role hashes and the minimum delay.
    pub async fn timelock_info(&self, timelock: Address) -> Result<TimelockInformation, ResolverError> {
        let plan: Plan = vec![
            (timelock, ReadCall::AdminRole),
            (timelock, ReadCall::ProposerRole),
            (timelock, ReadCall::ExecutorRole),
            (timelock, ReadCall::CancellerRole),
            (timelock, ReadCall::MinDelay),
        ];
        let v = self.execute("timelock_info", &plan, Mode::Batched).await?;
        Ok(TimelockInformation {
            address: timelock,
            admin_role: v[0].as_hash()?,
            proposer_role: v[1].as_hash()?,
            executor_role: v[2].as_hash()?,
            canceller_role: v[3].as_hash()?,
            min_delay: v[4].as_u256()?,
        })
    }

    /// `hasRole` for each of the four timelock roles.
    pub async fn user_roles(
        &self,
        timelock: &TimelockInformation,
        account: Address,
    ) -> Result<UserRoles, ResolverError> {
        let plan: Plan = timelock
            .roles()
            .into_iter()
            .map(|role| (timelock.address, ReadCall::HasRole { role, account }))
            .collect();
        let v = self.execute("user_roles", &plan, Mode::Batched).await?;
        Ok(UserRoles {
            account,
            admin: v[0].as_bool()?,
            proposer: v[1].as_bool()?,
            executor: v[2].as_bool()?,
            canceller: v[3].as_bool()?,
        })
    }

    pub async fn delegation_state(
        &self,
        token: Address,
        account: Address,
    ) -> Result<DelegationInformation, ResolverError> {
        let plan: Plan = vec![
            (token, ReadCall::Delegates(account)),
            (token, ReadCall::BalanceOf(account)),
            (token, ReadCall::GetVotes(account)),
            (token, ReadCall::TotalSupply),
        ];
        let v = self.execute("delegation_state", &plan, Mode::Batched).await?;
        Ok(DelegationInformation {
            account,
            delegate: v[0].as_address()?,
            balance: v[1].as_u256()?,
            votes: v[2].as_u256()?,
            total_supply: v[3].as_u256()?,
        })
    }

    pub async fn governor_info(&self, governor: Address) -> Result<GovernorInformation, ResolverError> {
        let plan: Plan = vec![
            (governor, ReadCall::GovernorName),
            (governor, ReadCall::VotingDelay),
            (governor, ReadCall::VotingPeriod),
            (governor, ReadCall::ProposalThreshold),
            (governor, ReadCall::QuorumNumerator),
            (governor, ReadCall::CountingMode),
        ];
        let v = self.execute("governor_info", &plan, Mode::Batched).await?;
        Ok(GovernorInformation {
            address: governor,
            name: v[0].as_text()?.to_string(),
            voting_delay: v[1].as_u256()?,
            voting_period: v[2].as_u256()?,
            proposal_threshold: v[3].as_u256()?,
            quorum_numerator: v[4].as_u256()?,
            counting_mode: v[5].as_text()?.to_string(),
        })
    }

    /// Native balance of `holder` followed by its balance of each token.
    pub async fn treasury_balances(
        &self,
        holder: Address,
        tokens: &[Address],
    ) -> Result<Vec<TreasuryBalance>, ResolverError> {
        let mut plan: Plan = vec![(self.multicall, ReadCall::EthBalance(holder))];
        plan.extend(tokens.iter().map(|t| (*t, ReadCall::BalanceOf(holder))));
        let v = self.execute("treasury_balances", &plan, Mode::Batched).await?;

        let mut balances = Vec::with_capacity(v.len());
        balances.push(TreasuryBalance {
            token: None,
            balance: v[0].as_u256()?,
        });
        for (token, value) in tokens.iter().zip(&v[1..]) {
            balances.push(TreasuryBalance {
                token: Some(*token),
                balance: value.as_u256()?,
            });
        }
        Ok(balances)
    }

    /// `token()` and `timelock()` of a governor. The timelock is optional:
    /// governors without timelock control revert on it.
    pub async fn governor_links(
        &self,
        governor: Address,
    ) -> Result<(Address, Option<Address>), ResolverError> {
        let plan: Plan = vec![(governor, ReadCall::Token), (governor, ReadCall::Timelock)];
        match self.execute_batched(&plan).await {
            Ok(v) => Ok((v[0].as_address()?, Some(v[1].as_address()?))),
            Err(err) => {
                warn!(error = %err, "aggregate failed, reading governor links one by one");
                self.observer.on_fallback("governor_links", &err);
                let token = fetch_single(&self.reader, governor, &ReadCall::Token)
                    .await?
                    .as_address()?;
                let timelock = match fetch_single(&self.reader, governor, &ReadCall::Timelock).await {
                    Ok(value) => Some(value.as_address()?),
                    Err(e) => {
                        debug!(error = %e, "governor has no timelock");
                        None
                    }
                };
                Ok((token, timelock))
            }
        }
    }

    /// Refresh one proposal: state, snapshot, deadline, votes and eta, plus
    /// `quorum` and past total supply at `snapshot` once it lies below `head`.
    ///
    /// `snapshot` is the vote start already known from the created log.
    pub async fn refresh_proposal(
        &self,
        governor: Address,
        token: Option<Address>,
        id: ProposalId,
        snapshot: Option<u64>,
        head: u64,
        mode: Mode,
    ) -> Result<Proposal, ResolverError> {
        let mut plan: Plan = vec![
            (governor, ReadCall::State(id)),
            (governor, ReadCall::ProposalSnapshot(id)),
            (governor, ReadCall::ProposalDeadline(id)),
            (governor, ReadCall::ProposalVotes(id)),
            (governor, ReadCall::ProposalEta(id)),
        ];
        let started = snapshot.filter(|start| *start < head);
        if let Some(start) = started {
            plan.push((governor, ReadCall::Quorum(start)));
            if let Some(token) = token {
                plan.push((token, ReadCall::PastTotalSupply(start)));
            }
        }

        let v = self.execute("refresh_proposal", &plan, mode).await?;
        let mut delta = Proposal::new(id);
        delta.state = Some(decode_proposal_state(v[0].as_u8()?)?);
        delta.snapshot = Some(block_from_u256(v[1].as_u256()?)?);
        delta.deadline = Some(block_from_u256(v[2].as_u256()?)?);
        delta.tally = Some(v[3].as_votes()?);
        delta.eta = non_zero(v[4].as_u256()?);
        if started.is_some() {
            delta.quorum = Some(v[REFRESH_FIELDS].as_u256()?);
            delta.total_supply = v
                .get(REFRESH_FIELDS + 1)
                .map(CallValue::as_u256)
                .transpose()?;
        }
        Ok(delta)
    }

    /// Board fields for every started proposal in one aggregate call.
    ///
    /// `proposals` pairs each id with its vote start. The flat result list is
    /// split back into chunks of `len / proposals.len()`. There is no fallback
    /// here: the board builder falls back to per-proposal refreshes.
    pub async fn board_fields(
        &self,
        governor: Address,
        proposals: &[(ProposalId, u64)],
    ) -> Result<Vec<Proposal>, ResolverError> {
        if proposals.is_empty() {
            return Ok(Vec::new());
        }
        let plan: Plan = proposals
            .iter()
            .flat_map(|(id, start)| {
                [
                    (governor, ReadCall::State(*id)),
                    (governor, ReadCall::ProposalVotes(*id)),
                    (governor, ReadCall::ProposalEta(*id)),
                    (governor, ReadCall::ProposalDeadline(*id)),
                    (governor, ReadCall::Quorum(*start)),
                ]
            })
            .collect();

        let values = self.execute_batched(&plan).await?;
        let per_proposal = values.len() / proposals.len();
        if per_proposal != BOARD_FIELDS || values.len() % proposals.len() != 0 {
            return Err(ResolverError::LengthMismatch {
                expected: plan.len(),
                actual: values.len(),
            });
        }

        proposals
            .iter()
            .zip(values.chunks(per_proposal))
            .map(|((id, start), v)| {
                let mut delta = Proposal::new(*id);
                delta.state = Some(decode_proposal_state(v[0].as_u8()?)?);
                delta.tally = Some(v[1].as_votes()?);
                delta.eta = non_zero(v[2].as_u256()?);
                delta.deadline = Some(block_from_u256(v[3].as_u256()?)?);
                delta.snapshot = Some(*start);
                delta.quorum = Some(v[4].as_u256()?);
                Ok(delta)
            })
            .collect()
    }
}

/// `proposalEta` is zero until the proposal is queued.
fn non_zero(value: U256) -> Option<U256> {
    (!value.is_zero()).then_some(value)
}
