//! govsync engine: keeps a governance proposal board in sync with the chain.
//!
//! The engine is the coordinator that:
//! - Scans governor logs in bounded windows, shrinking once on provider limits
//! - Refreshes on-chain proposal fields through Multicall, falling back to
//!   single calls when the aggregate fails
//! - Merges every delta into one deduplicated proposal index
//! - Answers token, timelock, delegation and treasury queries
//! - Counts ledger traffic and exposes it as Prometheus metrics

pub mod board_event;
pub mod config;
pub mod engine;
pub mod error;
pub mod metered;
pub mod metrics;
pub mod scanner;
pub mod tracing_spans;

pub use board_event::{BoardEvent, EventBus};
pub use config::{EngineConfig, DEFAULT_MULTICALL};
pub use engine::{GovernanceSync, KindCounts, ScanSummary};
pub use error::{ConfigError, SyncError};
pub use metered::MeteredReader;
pub use metrics::SyncMetrics;
pub use scanner::{LogScanner, DEFAULT_LOG_WINDOW, REDUCED_LOG_WINDOW};
