//! A [`LedgerReader`] wrapper that counts every round trip.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use govsync_governance::abi::IMulticall;
use govsync_ledger::{BlockHeader, BlockId, LedgerError, LedgerReader, LogFilter, RawLog};
use govsync_utils::format_elapsed;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::SyncMetrics;

/// Counts ledger traffic by kind and, with `debug_timing`, logs how long each
/// call took.
pub struct MeteredReader<R> {
    inner: R,
    metrics: Arc<SyncMetrics>,
    multicall: Address,
    debug_timing: AtomicBool,
}

impl<R: LedgerReader> MeteredReader<R> {
    pub fn new(inner: R, metrics: Arc<SyncMetrics>, multicall: Address) -> Self {
        Self {
            inner,
            metrics,
            multicall,
            debug_timing: AtomicBool::new(false),
        }
    }

    pub fn with_debug_timing(self, enabled: bool) -> Self {
        self.set_debug_timing(enabled);
        self
    }

    pub fn set_debug_timing(&self, enabled: bool) {
        self.debug_timing.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_timing(&self) -> bool {
        self.debug_timing.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn is_aggregate(&self, target: Address, data: &[u8]) -> bool {
        target == self.multicall
            && data.get(..4) == Some(IMulticall::aggregateCall::SELECTOR.as_slice())
    }

    async fn timed<T>(
        &self,
        method: &'static str,
        fut: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        if !self.debug_timing() {
            return fut.await;
        }
        let started = Instant::now();
        let result = fut.await;
        debug!(
            method,
            elapsed = %format_elapsed(started.elapsed()),
            ok = result.is_ok(),
            "ledger call"
        );
        result
    }
}

#[async_trait]
impl<R: LedgerReader> LedgerReader for MeteredReader<R> {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.metrics.block_queries.inc();
        self.timed("eth_blockNumber", self.inner.block_number()).await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.metrics.code_queries.inc();
        self.timed("eth_getCode", self.inner.get_code(address)).await
    }

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError> {
        self.metrics.block_queries.inc();
        self.timed("eth_getBlock", self.inner.get_block(id)).await
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        self.metrics.log_queries.inc();
        self.timed("eth_getLogs", self.inner.query_logs(filter)).await
    }

    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        if self.is_aggregate(target, &data) {
            self.metrics.batched_calls.inc();
            self.timed("aggregate", self.inner.call(target, data)).await
        } else {
            self.metrics.single_calls.inc();
            self.timed("eth_call", self.inner.call(target, data)).await
        }
    }
}
