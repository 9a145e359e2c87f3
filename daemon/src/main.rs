//! Command-line entry point for the governance synchronization engine.

use alloy_primitives::Address;
use clap::Parser;
use govsync_ledger::JsonRpcReader;
use govsync_node::{EngineConfig, GovernanceSync, SyncError};
use govsync_store::{StoreError, StoreSnapshot};
use govsync_types::ProposalId;
use govsync_utils::init_logging;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

type Engine = GovernanceSync<JsonRpcReader>;

#[derive(Parser)]
#[command(name = "govsync", about = "Keep a governance proposal board in sync with the chain")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "GOVSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint.
    #[arg(long, env = "GOVSYNC_RPC_URL")]
    rpc_url: Option<String>,

    /// Governor contract address.
    #[arg(long, env = "GOVSYNC_GOVERNOR")]
    governor: Option<Address>,

    /// Voting token address (read from the governor when omitted).
    #[arg(long, env = "GOVSYNC_TOKEN")]
    token: Option<Address>,

    /// Timelock address (read from the governor when omitted).
    #[arg(long, env = "GOVSYNC_TIMELOCK")]
    timelock: Option<Address>,

    /// Multicall aggregator address.
    #[arg(long, env = "GOVSYNC_MULTICALL")]
    multicall: Option<Address>,

    /// Initial log scan window in blocks.
    #[arg(long, env = "GOVSYNC_LOG_WINDOW")]
    log_window: Option<u64>,

    /// Log the elapsed time of every ledger call.
    #[arg(long, env = "GOVSYNC_DEBUG_TIMING")]
    debug_timing: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GOVSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "GOVSYNC_LOG_FORMAT")]
    log_format: Option<String>,

    /// Board snapshot file, restored on start and written after each build.
    #[arg(long, env = "GOVSYNC_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Build the proposal board and print it.
    Board {
        /// Incremental build from this checkpoint block.
        #[arg(long)]
        from_block: Option<u64>,
    },
    /// Refresh one proposal and print it.
    Proposal {
        /// Decimal proposal id.
        id: ProposalId,
    },
    /// Print every comment with its timestamp.
    Comments,
    /// Build the board, then print event and ledger traffic statistics.
    Stats,
    /// Print governor, token, timelock and treasury information.
    Info,
    /// Print the timelock roles held by an account.
    Roles { account: Address },
    /// Print the delegation state of an account.
    Delegation { account: Address },
    /// Print every active delegation.
    Delegators,
    /// Guess the kind of contract deployed at an address.
    Inspect { address: Address },
    /// Rebuild the board on a fixed interval until Ctrl-C.
    Watch {
        /// Seconds between refreshes (defaults to the config value).
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Serialize)]
struct StatsReport {
    governance: govsync_types::GovernanceStats,
    api: govsync_types::ApiStats,
}

#[derive(Serialize)]
struct InfoReport {
    addresses: govsync_types::ContractAddresses,
    governor: govsync_types::GovernorInformation,
    token: Option<govsync_types::TokenInformation>,
    timelock: Option<govsync_types::TimelockInformation>,
    treasury: Vec<govsync_types::TreasuryBalance>,
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(governor) = cli.governor {
        config.governor = governor;
    }
    if cli.token.is_some() {
        config.token = cli.token;
    }
    if cli.timelock.is_some() {
        config.timelock = cli.timelock;
    }
    if let Some(multicall) = cli.multicall {
        config.multicall = multicall;
    }
    if let Some(window) = cli.log_window {
        config.log_window = window;
    }
    config.debug_timing |= cli.debug_timing;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn restore_snapshot(engine: &mut Engine, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else { return Ok(()) };
    match StoreSnapshot::load(path) {
        Ok(snapshot) => {
            tracing::info!(
                path = %path.display(),
                proposals = snapshot.proposals.len(),
                checkpoint = ?snapshot.checkpoint,
                "restored board snapshot"
            );
            engine.restore(snapshot);
            Ok(())
        }
        Err(StoreError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn save_snapshot(engine: &Engine, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        engine.snapshot().save(path)?;
    }
    Ok(())
}

/// Next incremental build start, or a cold start without a checkpoint.
fn next_from_block(engine: &Engine) -> Option<u64> {
    engine.store().checkpoint().map(|c| c + 1)
}

/// One tick of the watch loop. Empty deltas are not failures.
async fn refresh(engine: &Mutex<Engine>, snapshot: Option<&Path>) -> anyhow::Result<()> {
    let mut engine = engine.lock().await;
    let from = next_from_block(&engine);
    match engine.build_proposal_board(from).await {
        Ok(board) => {
            tracing::info!(proposals = board.len(), "board refreshed");
            save_snapshot(&engine, snapshot)
        }
        Err(SyncError::NoNewLogs { from_block }) => {
            tracing::debug!(from_block, "board up to date");
            Ok(())
        }
        Err(SyncError::NoProposals) => {
            tracing::warn!("governor has no proposals yet");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn watch(engine: Engine, interval: Duration, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    let engine = Arc::new(Mutex::new(engine));
    let loading = Arc::new(AtomicBool::new(false));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_secs = interval.as_secs(), "watching governor");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if loading.swap(true, Ordering::AcqRel) {
                    tracing::debug!("previous refresh still running, skipping tick");
                    continue;
                }
                let (engine, loading, snapshot) = (engine.clone(), loading.clone(), snapshot.clone());
                tokio::spawn(async move {
                    if let Err(e) = refresh(&engine, snapshot.as_deref()).await {
                        tracing::error!(error = %e, "board refresh failed");
                    }
                    loading.store(false, Ordering::Release);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    // Let an in-flight refresh finish writing its snapshot.
    let engine = engine.lock().await;
    tracing::info!(api = ?engine.api_stats(), "govsync exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level);

    let reader = JsonRpcReader::with_timeout(config.rpc_url.clone(), config.request_timeout());
    let mut engine = GovernanceSync::from_config(reader, &config)?;
    engine.discover_contracts().await?;
    let snapshot = cli.snapshot.clone();
    restore_snapshot(&mut engine, snapshot.as_deref())?;

    match cli.command {
        Command::Board { from_block } => {
            let from = from_block.or_else(|| next_from_block(&engine));
            let board = engine.build_proposal_board(from).await?;
            save_snapshot(&engine, snapshot.as_deref())?;
            print_json(&board)?;
        }
        Command::Proposal { id } => {
            let previous = match engine.proposal(&id) {
                Some(p) => p.clone(),
                None => govsync_types::Proposal::new(id),
            };
            let proposal = engine.update_proposal(&previous).await?;
            save_snapshot(&engine, snapshot.as_deref())?;
            print_json(&proposal)?;
        }
        Command::Comments => {
            print_json(&engine.query_all_comments().await?)?;
        }
        Command::Stats => {
            engine.build_proposal_board(None).await?;
            print_json(&StatsReport {
                governance: engine.stats(),
                api: engine.api_stats(),
            })?;
        }
        Command::Info => {
            let governor = engine.get_governor_info().await?;
            let token = match engine.contract_addresses().token {
                Some(_) => Some(engine.get_token_info().await?),
                None => None,
            };
            let timelock = match engine.contract_addresses().timelock {
                Some(_) => Some(engine.get_timelock_info().await?),
                None => None,
            };
            print_json(&InfoReport {
                addresses: *engine.contract_addresses(),
                governor,
                token,
                timelock,
                treasury: engine.get_treasury_balances().await?,
            })?;
        }
        Command::Roles { account } => {
            print_json(&engine.get_user_roles(account).await?)?;
        }
        Command::Delegation { account } => {
            print_json(&engine.get_delegation_state(account).await?)?;
        }
        Command::Delegators => {
            print_json(&engine.get_all_delegators().await?)?;
        }
        Command::Inspect { address } => {
            print_json(&engine.inspect(address).await?)?;
        }
        Command::Watch { interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            watch(engine, interval, snapshot).await?;
        }
    }

    Ok(())
}
