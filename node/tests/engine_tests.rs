//! Board synchronization against the simulated governor deployment.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use govsync_ledger::{BlockHeader, BlockId, LedgerError, LedgerReader, LogFilter, RawLog};
use govsync_node::{BoardEvent, EngineConfig, GovernanceSync, SyncError, REDUCED_LOG_WINDOW};
use govsync_store::StoreSnapshot;
use govsync_nullables::{
    NullLedger, SimulatedGovernor, BLOCK_TIME, GENESIS_TIME, GOVERNOR, MULTICALL, TIMELOCK, TOKEN,
};
use govsync_types::{ContractAddresses, ContractKind, Proposal, ProposalId, ProposalState, VoteSupport};
use std::sync::{Arc, Mutex};

type Engine = GovernanceSync<Arc<NullLedger>>;

const PROPOSER_A: Address = Address::new([0xa1; 20]);
const PROPOSER_B: Address = Address::new([0xb1; 20]);
const VOTER_1: Address = Address::new([0x11; 20]);
const VOTER_2: Address = Address::new([0x12; 20]);

fn addresses() -> ContractAddresses {
    ContractAddresses {
        governor: GOVERNOR,
        token: Some(TOKEN),
        timelock: Some(TIMELOCK),
        multicall: MULTICALL,
    }
}

/// Proposal 1 is active with two votes and a comment; proposal 2 has not
/// started at head 40.
fn scripted() -> (Arc<NullLedger>, SimulatedGovernor) {
    let ledger = Arc::new(NullLedger::new());
    let sim = SimulatedGovernor::deploy(ledger.clone());
    sim.propose(1, PROPOSER_A, "# Raise the cap\nDetails follow.", 10, 20, 80);
    sim.set_state(1, ProposalState::Active);
    sim.cast_vote(1, VOTER_1, VoteSupport::For, 600, 25);
    sim.cast_vote(1, VOTER_2, VoteSupport::Against, 100, 26);
    sim.comment(1, PROPOSER_A, "looks good", 27);
    sim.propose(2, PROPOSER_B, "# Later", 30, 200, 300);
    ledger.set_head(40);
    (ledger, sim)
}

fn engine(ledger: &Arc<NullLedger>) -> Engine {
    GovernanceSync::new(ledger.clone(), addresses())
}

fn find(board: &[Proposal], id: u64) -> &Proposal {
    board
        .iter()
        .find(|p| p.id == ProposalId::from(id))
        .expect("proposal on board")
}

#[tokio::test]
async fn cold_start_builds_started_and_pending_proposals() {
    let (ledger, _sim) = scripted();
    let mut engine = engine(&ledger);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

    let board = engine.build_proposal_board(None).await.unwrap();
    assert_eq!(board.len(), 2);

    let active = find(&board, 1);
    assert_eq!(active.state, Some(ProposalState::Active));
    assert_eq!(active.headline.as_deref(), Some("RAISE THE CAP"));
    let tally = active.tally.clone().unwrap();
    assert_eq!(tally.for_votes, U256::from(600u64));
    assert_eq!(tally.against_votes, U256::from(100u64));
    assert_eq!(active.quorum, Some(U256::from(500u64)));
    assert_eq!(active.quorum_reached, Some(true));
    assert_eq!(active.quorum_percent.as_deref(), Some("100"));
    assert_eq!(active.votes_for.len(), 1);
    assert_eq!(active.votes_against.len(), 1);
    assert_eq!(active.comments.len(), 1);
    assert_eq!(active.comments[0].timestamp, Some(GENESIS_TIME + 27 * BLOCK_TIME));

    let pending = find(&board, 2);
    assert_eq!(pending.state, Some(ProposalState::Pending));
    assert_eq!(pending.snapshot, Some(200));
    assert_eq!(pending.quorum, None);
    assert_eq!(pending.quorum_reached, None);
    assert_eq!(pending.total_supply, None);

    let api = engine.api_stats();
    // One aggregate for started proposals, one refresh for the pending one.
    assert_eq!(api.batched_calls, 2);
    assert_eq!(api.single_calls, 0);
    // created 1 + vote 2 + comment 1 + lifecycle 3 topics, one window each.
    assert_eq!(api.log_queries, 7);
    assert_eq!(api.fallbacks, 0);

    assert_eq!(engine.store().checkpoint(), Some(40));
    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[BoardEvent::BoardRebuilt {
            proposals: 2,
            checkpoint: 40
        }]
    );
}

#[tokio::test]
async fn no_proposals_on_cold_start_is_not_no_new_logs() {
    let ledger = Arc::new(NullLedger::new());
    SimulatedGovernor::deploy(ledger.clone());
    ledger.set_head(100);

    let mut engine = engine(&ledger);
    let err = engine.build_proposal_board(Some(0)).await.unwrap_err();
    assert!(matches!(err, SyncError::NoProposals), "got {err:?}");
    let err = engine.build_proposal_board(None).await.unwrap_err();
    assert!(matches!(err, SyncError::NoProposals), "got {err:?}");
}

#[tokio::test]
async fn empty_checkpoint_scan_raises_no_new_logs() {
    let (ledger, _sim) = scripted();
    ledger.set_head(100);
    let mut engine = engine(&ledger);
    let err = engine.build_proposal_board(Some(50)).await.unwrap_err();
    assert!(
        matches!(err, SyncError::NoNewLogs { from_block: 50 }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn fallback_reconstructs_the_batched_board() {
    let (batched_ledger, _a) = scripted();
    let (failing_ledger, _b) = scripted();
    failing_ledger.fail_aggregate(true);

    let mut batched = engine(&batched_ledger);
    let mut fallback = engine(&failing_ledger);
    let expected = batched.build_proposal_board(None).await.unwrap();
    let actual = fallback.build_proposal_board(None).await.unwrap();

    assert_eq!(expected.len(), actual.len());
    for (e, a) in expected.iter().zip(&actual) {
        assert_eq!(e.id, a.id);
        assert_eq!(e.state, a.state);
        assert_eq!(e.tally, a.tally);
        assert_eq!(e.quorum, a.quorum);
        assert_eq!(e.quorum_reached, a.quorum_reached);
        assert_eq!(e.quorum_percent, a.quorum_percent);
        assert_eq!(e.deadline, a.deadline);
        assert_eq!(e.eta, a.eta);
        assert_eq!(e.votes_for, a.votes_for);
        assert_eq!(e.comments, a.comments);
    }

    let api = fallback.api_stats();
    assert_eq!(api.fallbacks, 1);
    assert_eq!(api.batched_calls, 1);
    // Started proposal: 5 fields + quorum + past supply; pending: 5 fields.
    assert_eq!(api.single_calls, 12);
}

#[tokio::test]
async fn provider_limit_shrinks_the_window_once() {
    let (ledger, _sim) = scripted();
    ledger.set_head(2_500);
    ledger.limit_log_range(Some(1_000));

    let mut engine = engine(&ledger);
    let board = engine.build_proposal_board(None).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(engine.log_window(), REDUCED_LOG_WINDOW);
    assert_eq!(engine.api_stats().window_shrinks, 1);

    let queries = ledger.log_queries();
    assert_eq!(queries[0], (0, 2_500));
    assert!(queries[1..].iter().all(|(from, to)| to - from < 1_000));
}

#[tokio::test]
async fn incremental_build_refreshes_touched_proposals() {
    let (ledger, sim) = scripted();
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();

    sim.cast_vote(1, Address::repeat_byte(0x13), VoteSupport::For, 50, 45);
    let board = engine.build_proposal_board(Some(41)).await.unwrap();
    assert_eq!(board.len(), 2);

    let active = find(&board, 1);
    assert_eq!(active.votes_for.len(), 2);
    assert_eq!(active.tally.clone().unwrap().for_votes, U256::from(650u64));
    assert_eq!(engine.store().checkpoint(), Some(45));

    let err = engine.build_proposal_board(Some(46)).await.unwrap_err();
    assert!(matches!(err, SyncError::NoNewLogs { from_block: 46 }));
}

#[tokio::test]
async fn replaying_a_scan_does_not_duplicate_votes() {
    let (ledger, _sim) = scripted();
    let mut engine = engine(&ledger);
    let first = engine.build_proposal_board(None).await.unwrap();
    let second = engine.build_proposal_board(None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.stats().total_votes, 2);
}

#[tokio::test]
async fn update_proposal_picks_up_votes_and_state() {
    let (ledger, sim) = scripted();
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();

    sim.cast_vote(1, Address::repeat_byte(0x14), VoteSupport::Abstain, 10, 50);
    sim.set_state(1, ProposalState::Succeeded);
    let previous = engine.proposal(&ProposalId::from(1u64)).cloned().unwrap();

    let updated = engine.update_proposal(&previous).await.unwrap();
    assert_eq!(updated.state, Some(ProposalState::Succeeded));
    assert_eq!(updated.votes_abstain.len(), 1);
    assert_eq!(updated.votes_for.len(), 1);
    assert_eq!(updated.tally.unwrap().abstain_votes, U256::from(10u64));
    assert_eq!(updated.total_supply, Some(U256::from(10_000u64)));
}

#[tokio::test]
async fn comments_come_back_in_chain_order_with_timestamps() {
    let (ledger, sim) = scripted();
    sim.comment(1, VOTER_1, "second in block 27", 27);
    sim.comment(2, VOTER_2, "on the later one", 33);
    ledger.set_head(40);

    let mut engine = engine(&ledger);
    ledger.clear_history();
    let comments = engine.query_all_comments().await.unwrap();

    let messages: Vec<&str> = comments.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["looks good", "second in block 27", "on the later one"]);
    assert!(comments.iter().all(|c| c.timestamp.is_some()));
    assert_eq!(comments[2].timestamp, Some(GENESIS_TIME + 33 * BLOCK_TIME));
    // Two distinct blocks, one header lookup each.
    assert_eq!(ledger.block_lookups().len(), 2);
    assert_eq!(engine.stats().total_comments, 3);
}

#[tokio::test]
async fn event_stats_count_voters_and_proposers() {
    let (ledger, sim) = scripted();
    sim.cast_vote(2, VOTER_1, VoteSupport::For, 1, 35);
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total_proposals, 2);
    assert_eq!(stats.total_votes, 3);
    assert_eq!(stats.unique_voter_count(), 2);
    assert_eq!(stats.unique_proposer_count(), 2);
    assert_eq!(stats.votes_per_voter[&VOTER_1], 2);
    assert_eq!(stats.total_comments, 1);

    engine.reset();
    assert_eq!(engine.stats().total_votes, 0);
    assert!(engine.proposals().is_empty());
}

#[tokio::test]
async fn discovers_token_and_timelock_from_the_governor() {
    let (ledger, _sim) = scripted();
    let mut engine = GovernanceSync::new(
        ledger.clone(),
        ContractAddresses {
            governor: GOVERNOR,
            token: None,
            timelock: None,
            multicall: MULTICALL,
        },
    );
    assert!(matches!(
        engine.get_delegation_state(VOTER_1).await,
        Err(SyncError::MissingContract("token"))
    ));
    let found = engine.discover_contracts().await.unwrap();
    assert_eq!(found.token, Some(TOKEN));
    assert_eq!(found.timelock, Some(TIMELOCK));
}

#[tokio::test]
async fn token_queries_and_delegators() {
    let (ledger, sim) = scripted();
    let holder = Address::repeat_byte(0x31);
    let delegate = Address::repeat_byte(0x32);
    sim.set_balance(holder, 700);
    sim.delegate(holder, delegate, 12);
    sim.delegate(VOTER_1, VOTER_1, 13);

    let mut engine = engine(&ledger);
    let delegators = engine.get_all_delegators().await.unwrap();
    assert_eq!(delegators.len(), 2);

    let token = engine.get_token_info().await.unwrap();
    assert_eq!(token.symbol, "SVT");
    assert_eq!(token.decimals, 18);
    assert_eq!(token.members, Some(2));

    let state = engine.get_delegation_state(delegate).await.unwrap();
    assert_eq!(state.votes, U256::from(700u64));
}

#[tokio::test]
async fn governor_timelock_roles_and_treasury() {
    let (ledger, sim) = scripted();
    let account = Address::repeat_byte(0x41);
    sim.grant_role("PROPOSER_ROLE", account);
    ledger.set_eth_balance(TIMELOCK, U256::from(5u64));
    sim.set_balance(TIMELOCK, 250);

    let engine = engine(&ledger);
    let governor = engine.get_governor_info().await.unwrap();
    assert_eq!(governor.counting_mode, "support=bravo&quorum=for,abstain");

    let timelock = engine.get_timelock_info().await.unwrap();
    assert_eq!(timelock.min_delay, U256::from(172_800u64));

    let roles = engine.get_user_roles(account).await.unwrap();
    assert!(roles.proposer);
    assert!(!roles.admin);

    let treasury = engine.get_treasury_balances().await.unwrap();
    assert_eq!(treasury.len(), 2);
    assert_eq!(treasury[0].token, None);
    assert_eq!(treasury[0].balance, U256::from(5u64));
    assert_eq!(treasury[1].token, Some(TOKEN));
    assert_eq!(treasury[1].balance, U256::from(250u64));
}

#[tokio::test]
async fn inspect_sniffs_contract_kinds() {
    let (ledger, _sim) = scripted();
    let engine = engine(&ledger);
    assert_eq!(engine.inspect(GOVERNOR).await.unwrap(), ContractKind::Governor);
    assert_eq!(engine.inspect(TIMELOCK).await.unwrap(), ContractKind::Timelock);
    assert_eq!(engine.inspect(TOKEN).await.unwrap(), ContractKind::Erc20);
    assert_eq!(
        engine.inspect(Address::repeat_byte(0xee)).await.unwrap(),
        ContractKind::Unknown
    );
}

#[tokio::test]
async fn rebinding_the_governor_drops_the_index() {
    let (ledger, _sim) = scripted();
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();
    assert_eq!(engine.proposals().len(), 2);

    engine.bind_governor(GOVERNOR);
    assert_eq!(engine.proposals().len(), 2);

    engine.bind_governor(Address::repeat_byte(0x61));
    assert!(engine.proposals().is_empty());
    assert_eq!(engine.contract_addresses().token, None);
    assert_eq!(engine.store().checkpoint(), None);
}

#[tokio::test]
async fn config_drives_window_and_snapshot_restores_board() {
    let (ledger, _sim) = scripted();
    let config = EngineConfig {
        governor: GOVERNOR,
        token: Some(TOKEN),
        timelock: Some(TIMELOCK),
        multicall: MULTICALL,
        log_window: 15,
        ..EngineConfig::default()
    };
    let mut engine = GovernanceSync::from_config(ledger.clone(), &config).unwrap();
    assert_eq!(engine.log_window(), 15);
    engine.build_proposal_board(None).await.unwrap();
    // 41 blocks in windows of 15: three queries per topic.
    assert_eq!(engine.api_stats().log_queries, 7 * 3);

    let snapshot = engine.snapshot();
    let mut restored = GovernanceSync::from_config(ledger.clone(), &config).unwrap();
    restored.restore(snapshot.clone());
    assert_eq!(restored.proposals(), engine.proposals());
    assert_eq!(restored.store().checkpoint(), Some(40));
}

/// A chain that mines ten blocks every time its head is read.
struct AdvancingLedger(Arc<NullLedger>);

#[async_trait]
impl LedgerReader for AdvancingLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        let head = self.0.block_number().await?;
        self.0.set_head(head + 10);
        Ok(head)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.0.get_code(address).await
    }

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError> {
        self.0.get_block(id).await
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        self.0.query_logs(filter).await
    }

    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        self.0.call(target, data).await
    }
}

#[tokio::test]
async fn logs_mined_during_a_build_are_picked_up_by_the_next_one() {
    let (ledger, sim) = scripted();
    sim.propose(3, PROPOSER_B, "# Mined mid-build", 45, 100, 200);
    ledger.set_head(40);

    let mut engine = GovernanceSync::new(AdvancingLedger(ledger.clone()), addresses());
    let board = engine.build_proposal_board(None).await.unwrap();
    assert_eq!(board.len(), 2);
    // Every topic was scanned up to the head read at the start of the build.
    assert!(ledger.log_queries().iter().all(|(_, to)| *to == 40));
    assert_eq!(engine.store().checkpoint(), Some(40));

    let from = engine.store().checkpoint().map(|c| c + 1);
    let board = engine.build_proposal_board(from).await.unwrap();
    assert_eq!(board.len(), 3);
    let third = find(&board, 3);
    assert_eq!(third.headline.as_deref(), Some("MINED MID-BUILD"));
    assert_eq!(third.state, Some(ProposalState::Pending));
    assert_eq!(engine.store().checkpoint(), Some(50));
}

#[tokio::test]
async fn rescanning_only_indexed_logs_raises_no_new_logs() {
    let (ledger, sim) = scripted();
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();
    ledger.set_head(60);

    // Blocks 20..=60 hold votes, a comment and a proposal, all indexed.
    let err = engine.build_proposal_board(Some(20)).await.unwrap_err();
    assert!(
        matches!(err, SyncError::NoNewLogs { from_block: 20 }),
        "got {err:?}"
    );
    assert_eq!(engine.store().checkpoint(), Some(40));

    sim.cast_vote(1, Address::repeat_byte(0x15), VoteSupport::For, 5, 55);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));
    engine.build_proposal_board(Some(20)).await.unwrap();
    assert_eq!(engine.stats().total_votes, 3);
    assert_eq!(engine.store().checkpoint(), Some(60));
    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[BoardEvent::BoardRebuilt {
            proposals: 2,
            checkpoint: 60
        }]
    );
}

#[tokio::test]
async fn restored_engine_keeps_whole_history_stats() {
    let (ledger, sim) = scripted();
    let mut engine = engine(&ledger);
    engine.build_proposal_board(None).await.unwrap();
    let json = engine.snapshot().to_json().unwrap();

    let mut restored = GovernanceSync::new(ledger.clone(), addresses());
    restored.restore(StoreSnapshot::from_json(&json).unwrap());
    assert_eq!(restored.stats(), engine.stats());

    sim.cast_vote(2, Address::repeat_byte(0x16), VoteSupport::Against, 3, 45);
    restored.build_proposal_board(Some(41)).await.unwrap();

    let stats = restored.stats();
    assert_eq!(stats.total_votes, 3);
    assert_eq!(stats.unique_voter_count(), 3);
    assert_eq!(stats.total_proposals, 2);
    assert_eq!(stats.total_comments, 1);
    assert_eq!(restored.snapshot().stats, stats);
}

#[tokio::test]
async fn delegations_are_scanned_incrementally() {
    let (ledger, sim) = scripted();
    sim.delegate(VOTER_1, VOTER_1, 12);
    sim.delegate(VOTER_2, VOTER_1, 13);

    let mut engine = engine(&ledger);
    assert_eq!(engine.get_all_delegators().await.unwrap().len(), 2);

    ledger.clear_history();
    let token = engine.get_token_info().await.unwrap();
    assert_eq!(token.members, Some(2));
    assert!(ledger.log_queries().is_empty());

    sim.delegate(Address::repeat_byte(0x17), VOTER_2, 50);
    sim.delegate(VOTER_2, VOTER_2, 51);
    let delegators = engine.get_all_delegators().await.unwrap();
    assert_eq!(ledger.log_queries(), vec![(41, 51)]);
    assert_eq!(delegators.len(), 3);
    let moved = delegators.iter().find(|d| d.delegator == VOTER_2).unwrap();
    assert_eq!(moved.delegate, VOTER_2);
}
