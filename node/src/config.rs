//! Engine configuration with TOML file support.

use alloy_primitives::{address, Address};
use govsync_types::ContractAddresses;
use govsync_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::scanner::DEFAULT_LOG_WINDOW;
use crate::ConfigError;

/// Multicall3, deployed at the same address on most EVM chains.
pub const DEFAULT_MULTICALL: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Configuration for one synchronization engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// JSON-RPC endpoint of the ledger.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Governor contract. Required.
    #[serde(default)]
    pub governor: Address,

    /// Voting token. Read from the governor when unset.
    #[serde(default)]
    pub token: Option<Address>,

    /// Timelock. Read from the governor when unset.
    #[serde(default)]
    pub timelock: Option<Address>,

    /// Batch-call aggregator.
    #[serde(default = "default_multicall")]
    pub multicall: Address,

    /// Initial log scan window in blocks.
    #[serde(default = "default_log_window")]
    pub log_window: u64,

    /// Log the elapsed time of every ledger call.
    #[serde(default)]
    pub debug_timing: bool,

    /// Interval of the `watch` loop.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// ERC-20 tokens reported in treasury balances.
    #[serde(default)]
    pub treasury_tokens: Vec<Address>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request timeout of the JSON-RPC client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_multicall() -> Address {
    DEFAULT_MULTICALL
}

fn default_log_window() -> u64 {
    DEFAULT_LOG_WINDOW
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_window == 0 {
            return Err(ConfigError::Invalid("log_window must be at least 1".into()));
        }
        if self.governor.is_zero() {
            return Err(ConfigError::Invalid("governor address is required".into()));
        }
        if self.multicall.is_zero() {
            return Err(ConfigError::Invalid("multicall address must not be zero".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be at least 1".into()));
        }
        self.log_format()?;
        Ok(())
    }

    /// The parsed `log_format`; anything but "human" or "json" is invalid.
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        self.log_format.parse().map_err(ConfigError::Invalid)
    }

    pub fn addresses(&self) -> ContractAddresses {
        ContractAddresses {
            governor: self.governor,
            token: self.token,
            timelock: self.timelock,
            multicall: self.multicall,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            governor: Address::ZERO,
            token: None,
            timelock: None,
            multicall: default_multicall(),
            log_window: default_log_window(),
            debug_timing: false,
            poll_interval_secs: default_poll_interval_secs(),
            treasury_tokens: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
