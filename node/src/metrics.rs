//! Prometheus metrics for the synchronization engine.
//!
//! Every engine owns a dedicated [`Registry`], so two engines in one process
//! (or two tests) never share counters. [`SyncMetrics::api_stats`] is the
//! point-in-time view callers read through the engine's `api_stats`.

use govsync_resolver::{FallbackObserver, ResolverError};
use govsync_types::ApiStats;
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all engine-level Prometheus metrics.
pub struct SyncMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Aggregate calls sent to the Multicall contract.
    pub batched_calls: IntCounter,
    /// Plain `eth_call` round trips.
    pub single_calls: IntCounter,
    pub log_queries: IntCounter,
    pub code_queries: IntCounter,
    pub block_queries: IntCounter,
    /// Batched queries re-run call by call.
    pub fallbacks: IntCounter,
    pub window_shrinks: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Proposals currently in the index.
    pub proposals: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub board_build_seconds: Histogram,
}

impl SyncMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let batched_calls = register_int_counter_with_registry!(
            Opts::new("govsync_batched_calls_total", "Aggregate calls sent to Multicall"),
            registry
        )
        .expect("failed to register batched_calls counter");

        let single_calls = register_int_counter_with_registry!(
            Opts::new("govsync_single_calls_total", "Individual contract calls"),
            registry
        )
        .expect("failed to register single_calls counter");

        let log_queries = register_int_counter_with_registry!(
            Opts::new("govsync_log_queries_total", "Log range queries"),
            registry
        )
        .expect("failed to register log_queries counter");

        let code_queries = register_int_counter_with_registry!(
            Opts::new("govsync_code_queries_total", "Bytecode lookups"),
            registry
        )
        .expect("failed to register code_queries counter");

        let block_queries = register_int_counter_with_registry!(
            Opts::new(
                "govsync_block_queries_total",
                "Block height and header lookups"
            ),
            registry
        )
        .expect("failed to register block_queries counter");

        let fallbacks = register_int_counter_with_registry!(
            Opts::new(
                "govsync_fallbacks_total",
                "Batched queries re-run as single calls"
            ),
            registry
        )
        .expect("failed to register fallbacks counter");

        let window_shrinks = register_int_counter_with_registry!(
            Opts::new(
                "govsync_window_shrinks_total",
                "Log scan windows reduced after a provider limit"
            ),
            registry
        )
        .expect("failed to register window_shrinks counter");

        let proposals = register_int_gauge_with_registry!(
            Opts::new("govsync_proposals", "Proposals in the index"),
            registry
        )
        .expect("failed to register proposals gauge");

        // 10 ms to ~80 s.
        let board_build_seconds = register_histogram_with_registry!(
            HistogramOpts::new("govsync_board_build_seconds", "Board build latency in seconds")
                .buckets(prometheus::exponential_buckets(0.01, 2.0, 14).unwrap()),
            registry
        )
        .expect("failed to register board_build_seconds histogram");

        Self {
            registry,
            batched_calls,
            single_calls,
            log_queries,
            code_queries,
            block_queries,
            fallbacks,
            window_shrinks,
            proposals,
            board_build_seconds,
        }
    }

    pub fn api_stats(&self) -> ApiStats {
        ApiStats {
            batched_calls: self.batched_calls.get(),
            single_calls: self.single_calls.get(),
            log_queries: self.log_queries.get(),
            code_queries: self.code_queries.get(),
            block_queries: self.block_queries.get(),
            fallbacks: self.fallbacks.get(),
            window_shrinks: self.window_shrinks.get(),
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackObserver for SyncMetrics {
    fn on_fallback(&self, _query: &'static str, _error: &ResolverError) {
        self.fallbacks.inc();
    }
}
