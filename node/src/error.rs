use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("ledger error: {0}")]
    Ledger(#[from] govsync_ledger::LedgerError),

    #[error(transparent)]
    Governance(#[from] govsync_governance::GovernanceError),

    #[error("resolver error: {0}")]
    Resolver(#[from] govsync_resolver::ResolverError),

    #[error("store error: {0}")]
    Store(#[from] govsync_store::StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An incremental scan found nothing since the checkpoint.
    #[error("no new governance logs since block {from_block}")]
    NoNewLogs { from_block: u64 },

    /// The governor has never emitted a proposal.
    #[error("no proposals found for this governor")]
    NoProposals,

    #[error("{0} address is not known")]
    MissingContract(&'static str),
}
