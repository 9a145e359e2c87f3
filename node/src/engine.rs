//! The synchronization engine.
//!
//! [`GovernanceSync`] owns one store, one scanner and one resolver. Every
//! operation takes `&mut self`: callers serialize refreshes, the engine does
//! no locking of its own.

use alloy_primitives::{Address, B256};
use govsync_governance::{
    bytecode, decode_delegate_changed, DelegationBook, GovernanceEvent, DELEGATE_CHANGED_TOPIC,
};
use govsync_ledger::{BlockId, LedgerReader, RawLog};
use govsync_resolver::{Mode, Resolver};
use govsync_store::{GovernanceStore, IndexedEvent, StoreSnapshot};
use govsync_types::{
    ApiStats, Comment, ContractAddresses, ContractKind, DelegationInformation, Delegator,
    EventKind, GovernanceStats, GovernorInformation, Proposal, ProposalId, TimelockInformation,
    TokenInformation, TreasuryBalance, UserRoles,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::board_event::{BoardEvent, EventBus};
use crate::config::EngineConfig;
use crate::metered::MeteredReader;
use crate::metrics::SyncMetrics;
use crate::scanner::{LogScanner, DEFAULT_LOG_WINDOW};
use crate::tracing_spans::{board_build_span, comment_sweep_span, proposal_refresh_span};
use crate::SyncError;

const ALL_KINDS: [EventKind; 4] = [
    EventKind::Created,
    EventKind::Vote,
    EventKind::Comment,
    EventKind::Lifecycle,
];

/// Logs seen by one scan, per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub created: usize,
    pub votes: usize,
    pub comments: usize,
    pub lifecycle: usize,
}

impl KindCounts {
    fn bump(&mut self, kind: EventKind) {
        match kind {
            EventKind::Created => self.created += 1,
            EventKind::Vote => self.votes += 1,
            EventKind::Comment => self.comments += 1,
            EventKind::Lifecycle => self.lifecycle += 1,
        }
    }

    /// Created, vote and comment logs. Lifecycle logs alone do not count as
    /// governance activity.
    pub fn governance(&self) -> usize {
        self.created + self.votes + self.comments
    }

    pub fn total(&self) -> usize {
        self.governance() + self.lifecycle
    }
}

/// What one scan found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Every decoded log, already indexed ones included.
    pub scanned: KindCounts,
    /// Logs the store had not indexed before this scan.
    pub fresh: KindCounts,
    /// Proposals referenced by a fresh log.
    pub touched: BTreeSet<ProposalId>,
    /// Head the scan was bounded by.
    pub head: u64,
}

impl ScanSummary {
    fn record(&mut self, event: &GovernanceEvent, fresh: bool) {
        self.scanned.bump(event.kind());
        if fresh {
            self.fresh.bump(event.kind());
            self.touched.insert(event.proposal_id());
        }
    }

    /// New created, vote and comment logs.
    pub fn new_governance_logs(&self) -> usize {
        self.fresh.governance()
    }
}

pub struct GovernanceSync<R> {
    resolver: Resolver<MeteredReader<R>>,
    scanner: LogScanner,
    store: GovernanceStore,
    addresses: ContractAddresses,
    treasury_tokens: Vec<Address>,
    delegations: DelegationBook,
    /// Highest token block folded into `delegations`.
    delegations_checkpoint: Option<u64>,
    metrics: Arc<SyncMetrics>,
    bus: EventBus,
}

impl<R: LedgerReader> GovernanceSync<R> {
    pub fn new(reader: R, addresses: ContractAddresses) -> Self {
        let metrics = Arc::new(SyncMetrics::new());
        let metered = MeteredReader::new(reader, metrics.clone(), addresses.multicall);
        Self {
            resolver: Resolver::new(metered, addresses.multicall).with_observer(metrics.clone()),
            scanner: LogScanner::new(DEFAULT_LOG_WINDOW),
            store: GovernanceStore::create(),
            addresses,
            treasury_tokens: Vec::new(),
            delegations: DelegationBook::new(),
            delegations_checkpoint: None,
            metrics,
            bus: EventBus::new(),
        }
    }

    pub fn from_config(reader: R, config: &EngineConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let mut engine = Self::new(reader, config.addresses());
        engine.scanner.set_window(config.log_window);
        engine.set_debug_timing(config.debug_timing);
        engine.treasury_tokens = config.treasury_tokens.clone();
        Ok(engine)
    }

    /// Start from a previously saved index.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.store = GovernanceStore::restore(snapshot);
        self.metrics.proposals.set(self.store.len() as i64);
    }

    fn reader(&self) -> &MeteredReader<R> {
        self.resolver.reader()
    }

    // ── Introspection and knobs ────────────────────────────────────────

    pub fn contract_addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    pub fn stats(&self) -> GovernanceStats {
        self.store.event_stats()
    }

    pub fn api_stats(&self) -> ApiStats {
        self.metrics.api_stats()
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &GovernanceStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn proposals(&self) -> Vec<Proposal> {
        self.store.proposals().cloned().collect()
    }

    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.store.proposal(id)
    }

    pub fn log_window(&self) -> u64 {
        self.scanner.window()
    }

    pub fn set_log_window(&mut self, window: u64) {
        self.scanner.set_window(window);
    }

    pub fn set_debug_timing(&self, enabled: bool) {
        self.reader().set_debug_timing(enabled);
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&BoardEvent) + Send + Sync>) {
        self.bus.subscribe(listener);
    }

    /// Forget every indexed event, proposal and delegation.
    pub fn reset(&mut self) {
        self.store.reset();
        self.forget_delegations();
        self.metrics.proposals.set(0);
    }

    fn forget_delegations(&mut self) {
        self.delegations = DelegationBook::new();
        self.delegations_checkpoint = None;
    }

    // ── Contract wiring ────────────────────────────────────────────────

    /// Track `governor`. A different address than the tracked one is
    /// rebound with a warning; the index and derived addresses are dropped.
    pub fn bind_governor(&mut self, governor: Address) {
        if governor == self.addresses.governor {
            return;
        }
        warn!(
            tracked = %self.addresses.governor,
            provided = %governor,
            "governor address mismatch, rebinding"
        );
        self.addresses.governor = governor;
        self.addresses.token = None;
        self.addresses.timelock = None;
        self.reset();
    }

    pub fn bind_token(&mut self, token: Address) {
        if self.addresses.token == Some(token) {
            return;
        }
        if let Some(tracked) = self.addresses.token {
            warn!(tracked = %tracked, provided = %token, "token address mismatch, rebinding");
        }
        self.addresses.token = Some(token);
        self.forget_delegations();
    }

    /// Fill in the token and timelock from the governor when not configured.
    pub async fn discover_contracts(&mut self) -> Result<ContractAddresses, SyncError> {
        if self.addresses.token.is_none() || self.addresses.timelock.is_none() {
            let (token, timelock) = self.resolver.governor_links(self.addresses.governor).await?;
            self.addresses.token.get_or_insert(token);
            if self.addresses.timelock.is_none() {
                self.addresses.timelock = timelock;
            }
            info!(token = %token, timelock = ?timelock, "discovered governor contracts");
        }
        Ok(self.addresses)
    }

    /// Heuristic contract kind of any address, from its bytecode.
    pub async fn inspect(&self, address: Address) -> Result<ContractKind, SyncError> {
        let code = self.reader().get_code(address).await?;
        Ok(bytecode::detect_contract_kind(&code))
    }

    fn token(&self) -> Result<Address, SyncError> {
        self.addresses.token.ok_or(SyncError::MissingContract("token"))
    }

    fn timelock(&self) -> Result<Address, SyncError> {
        self.addresses.timelock.ok_or(SyncError::MissingContract("timelock"))
    }

    // ── Log scanning ───────────────────────────────────────────────────

    async fn scan_topic(
        &mut self,
        address: Address,
        topic: B256,
        from: Option<BlockId>,
        head: u64,
    ) -> Result<Vec<RawLog>, SyncError> {
        let was_shrunk = self.scanner.is_shrunk();
        let result = self
            .scanner
            .iterate_logs_until(self.resolver.reader(), address, topic, from, head)
            .await;
        if !was_shrunk && self.scanner.is_shrunk() {
            self.metrics.window_shrinks.inc();
        }
        Ok(result?)
    }

    /// Scan the governor for `kinds` from `from` up to the current head and
    /// index what was found.
    pub async fn query_logs(
        &mut self,
        kinds: &[EventKind],
        from: Option<BlockId>,
    ) -> Result<ScanSummary, SyncError> {
        let head = self.reader().block_number().await?;
        self.scan_kinds(kinds, from, head).await
    }

    /// Every topic of `kinds` is bounded by the same `head`.
    async fn scan_kinds(
        &mut self,
        kinds: &[EventKind],
        from: Option<BlockId>,
        head: u64,
    ) -> Result<ScanSummary, SyncError> {
        let governor = self.addresses.governor;
        let mut summary = ScanSummary {
            head,
            ..ScanSummary::default()
        };
        for kind in kinds {
            for topic in GovernanceEvent::topics(*kind) {
                let logs = self.scan_topic(governor, topic, from, head).await?;
                for log in &logs {
                    let event = GovernanceEvent::decode(log)?;
                    let fresh = self.store.ingest(IndexedEvent::new(event.clone(), log));
                    summary.record(&event, fresh);
                }
            }
        }
        debug!(
            created = summary.scanned.created,
            votes = summary.scanned.votes,
            comments = summary.scanned.comments,
            lifecycle = summary.scanned.lifecycle,
            new = summary.fresh.total(),
            head,
            "log scan finished"
        );
        Ok(summary)
    }

    /// Every governance event kind, lifecycle included.
    pub async fn query_all_logs(&mut self, from: Option<BlockId>) -> Result<ScanSummary, SyncError> {
        self.query_logs(&ALL_KINDS, from).await
    }

    // ── Synchronization ────────────────────────────────────────────────

    /// Reconcile the board with the chain.
    ///
    /// `from_block` of `None` or zero is a cold start over the whole history.
    /// A non-zero block is a checkpoint: only proposals touched by new logs
    /// since then are refreshed, and a scan that indexes no new created, vote
    /// or comment log is [`SyncError::NoNewLogs`].
    ///
    /// The head is read once; every topic is scanned up to it and the
    /// checkpoint advances to exactly that block.
    pub async fn build_proposal_board(
        &mut self,
        from_block: Option<u64>,
    ) -> Result<Vec<Proposal>, SyncError> {
        let span = board_build_span(&self.addresses.governor, from_block);
        self.build_board(from_block).instrument(span).await
    }

    async fn build_board(&mut self, from_block: Option<u64>) -> Result<Vec<Proposal>, SyncError> {
        let timer = self.metrics.board_build_seconds.start_timer();
        let checkpoint = from_block.filter(|b| *b > 0);

        let head = self.reader().block_number().await?;
        let summary = self
            .scan_kinds(&ALL_KINDS, from_block.map(BlockId::Number), head)
            .await?;
        if let Some(from) = checkpoint {
            if summary.new_governance_logs() == 0 {
                return Err(SyncError::NoNewLogs { from_block: from });
            }
        }
        if self.store.is_empty() {
            return Err(SyncError::NoProposals);
        }

        let targets: Vec<ProposalId> = match checkpoint {
            Some(_) => summary.touched.iter().copied().collect(),
            None => self.store.proposals().map(|p| p.id).collect(),
        };

        let mut started = Vec::new();
        let mut pending = Vec::new();
        for id in &targets {
            match self.store.proposal(id).and_then(|p| p.snapshot) {
                Some(start) if start < head => started.push((*id, start)),
                snapshot => pending.push((*id, snapshot)),
            }
        }

        let governor = self.addresses.governor;
        let token = self.addresses.token;
        match self.resolver.board_fields(governor, &started).await {
            Ok(deltas) => {
                for delta in &deltas {
                    self.store.merge(delta);
                }
                for (id, snapshot) in pending.iter().copied() {
                    let delta = self
                        .resolver
                        .refresh_proposal(governor, token, id, snapshot, head, Mode::Batched)
                        .await?;
                    self.store.merge(&delta);
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    proposals = targets.len(),
                    "board aggregate failed, refreshing every proposal call by call"
                );
                self.resolver.report_fallback("build_proposal_board", &err);
                for id in &targets {
                    let snapshot = self.store.proposal(id).and_then(|p| p.snapshot);
                    let delta = self
                        .resolver
                        .refresh_proposal(governor, token, *id, snapshot, head, Mode::Single)
                        .await?;
                    self.store.merge(&delta);
                }
            }
        }

        self.stamp_comments().await?;
        self.store.advance_checkpoint(head);
        self.metrics.proposals.set(self.store.len() as i64);
        timer.observe_duration();

        info!(
            proposals = self.store.len(),
            refreshed = targets.len(),
            started = started.len(),
            pending = pending.len(),
            checkpoint = head,
            "proposal board rebuilt"
        );
        self.bus.emit(&BoardEvent::BoardRebuilt {
            proposals: self.store.len(),
            checkpoint: head,
        });
        Ok(self.proposals())
    }

    /// Refresh one proposal: new votes since its creation block, then its
    /// on-chain fields.
    pub async fn update_proposal(&mut self, previous: &Proposal) -> Result<Proposal, SyncError> {
        let span = proposal_refresh_span(&previous.id);
        self.refresh_one(previous).instrument(span).await
    }

    async fn refresh_one(&mut self, previous: &Proposal) -> Result<Proposal, SyncError> {
        let id = previous.id;
        self.store.merge(previous);
        let head = self.reader().block_number().await?;
        self.scan_kinds(
            &[EventKind::Vote],
            previous.block_number.map(BlockId::Number),
            head,
        )
        .await?;

        let snapshot = self.store.proposal(&id).and_then(|p| p.snapshot);
        let delta = self
            .resolver
            .refresh_proposal(
                self.addresses.governor,
                self.addresses.token,
                id,
                snapshot,
                head,
                Mode::Batched,
            )
            .await?;
        let merged = self.store.merge(&delta).clone();
        debug!(id = %id, state = ?merged.state, votes = merged.vote_count(), "proposal refreshed");
        self.bus.emit(&BoardEvent::ProposalUpdated { id });
        Ok(merged)
    }

    /// Every comment on the governor, in chain order, with block timestamps.
    pub async fn query_all_comments(&mut self) -> Result<Vec<Comment>, SyncError> {
        let span = comment_sweep_span(&self.addresses.governor);
        self.sweep_comments().instrument(span).await
    }

    async fn sweep_comments(&mut self) -> Result<Vec<Comment>, SyncError> {
        self.query_logs(&[EventKind::Comment], None).await?;
        self.stamp_comments().await?;
        let comments = self.comments();
        self.bus.emit(&BoardEvent::CommentsUpdated {
            comments: comments.len(),
        });
        Ok(comments)
    }

    /// Indexed comments in chain order, as merged into their proposals.
    pub fn comments(&self) -> Vec<Comment> {
        self.store
            .index(EventKind::Comment)
            .events()
            .into_iter()
            .filter_map(|indexed| {
                let id = indexed.event.proposal_id();
                self.store
                    .proposal(&id)?
                    .comments
                    .iter()
                    .find(|c| c.transaction_hash == indexed.transaction_hash)
                    .cloned()
            })
            .collect()
    }

    /// Resolve missing comment timestamps, one block lookup per distinct block.
    async fn stamp_comments(&mut self) -> Result<(), SyncError> {
        let mut blocks = BTreeSet::new();
        let mut ids = Vec::new();
        for p in self.store.proposals() {
            let unstamped: Vec<u64> = p
                .comments
                .iter()
                .filter(|c| c.timestamp.is_none())
                .map(|c| c.block_number)
                .collect();
            if !unstamped.is_empty() {
                ids.push(p.id);
                blocks.extend(unstamped);
            }
        }
        if blocks.is_empty() {
            return Ok(());
        }

        let mut stamps = BTreeMap::new();
        for block in blocks {
            let header = self.reader().get_block(BlockId::Number(block)).await?;
            stamps.insert(block, header.timestamp);
        }
        for id in ids {
            if let Some(p) = self.store.proposal_mut(&id) {
                for c in p.comments.iter_mut().filter(|c| c.timestamp.is_none()) {
                    c.timestamp = stamps.get(&c.block_number).copied();
                }
            }
        }
        Ok(())
    }

    // ── Contract queries ───────────────────────────────────────────────

    /// Token metadata; `members` counts accounts with an active delegation.
    pub async fn get_token_info(&mut self) -> Result<TokenInformation, SyncError> {
        let token = self.token()?;
        let mut info = self.resolver.token_info(token).await?;
        self.sync_delegations().await?;
        info.members = Some(self.delegations.len() as u64);
        Ok(info)
    }

    pub async fn get_timelock_info(&self) -> Result<TimelockInformation, SyncError> {
        Ok(self.resolver.timelock_info(self.timelock()?).await?)
    }

    pub async fn get_user_roles(&self, account: Address) -> Result<UserRoles, SyncError> {
        let timelock = self.get_timelock_info().await?;
        Ok(self.resolver.user_roles(&timelock, account).await?)
    }

    pub async fn get_delegation_state(
        &self,
        account: Address,
    ) -> Result<DelegationInformation, SyncError> {
        Ok(self.resolver.delegation_state(self.token()?, account).await?)
    }

    pub async fn get_governor_info(&self) -> Result<GovernorInformation, SyncError> {
        Ok(self.resolver.governor_info(self.addresses.governor).await?)
    }

    /// Holdings of the timelock (the governor without one): native balance
    /// first, then the voting token and each configured treasury token.
    pub async fn get_treasury_balances(&self) -> Result<Vec<TreasuryBalance>, SyncError> {
        let holder = self.addresses.timelock.unwrap_or(self.addresses.governor);
        let mut tokens: Vec<Address> = self.addresses.token.into_iter().collect();
        for t in &self.treasury_tokens {
            if !tokens.contains(t) {
                tokens.push(*t);
            }
        }
        Ok(self.resolver.treasury_balances(holder, &tokens).await?)
    }

    /// Current delegations. `DelegateChanged` logs are folded into a cached
    /// book; each call only scans blocks past the previous one.
    pub async fn get_all_delegators(&mut self) -> Result<Vec<Delegator>, SyncError> {
        self.sync_delegations().await?;
        Ok(self.delegations.all())
    }

    async fn sync_delegations(&mut self) -> Result<(), SyncError> {
        let token = self.token()?;
        let head = self.reader().block_number().await?;
        let from = self.delegations_checkpoint.map_or(0, |c| c + 1);
        if from > head {
            return Ok(());
        }
        let logs = self
            .scan_topic(token, DELEGATE_CHANGED_TOPIC, Some(BlockId::Number(from)), head)
            .await?;
        for log in &logs {
            self.delegations.apply(decode_delegate_changed(log)?);
        }
        self.delegations_checkpoint = Some(head);
        debug!(
            from,
            head,
            found = logs.len(),
            delegators = self.delegations.len(),
            "delegations synced"
        );
        Ok(())
    }
}
