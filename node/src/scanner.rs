//! Windowed historical log scanning.
//!
//! Providers cap the block span of a single `eth_getLogs`. The scanner walks
//! `[start, head]` in fixed windows and, the first time a provider reports a
//! limit, drops to a small window for good and restarts the scan from the
//! beginning. A second limit error is returned to the caller.

use alloy_primitives::{Address, B256};
use govsync_ledger::{BlockId, LedgerError, LedgerReader, LogFilter, RawLog};
use tracing::{debug, warn};

use crate::tracing_spans::log_scan_span;
use tracing::Instrument;

/// Initial window size in blocks.
pub const DEFAULT_LOG_WINDOW: u64 = 100_000;

/// Window size after a provider limit was hit.
pub const REDUCED_LOG_WINDOW: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct LogScanner {
    window: u64,
    shrunk: bool,
}

impl Default for LogScanner {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_WINDOW)
    }
}

impl LogScanner {
    pub fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            shrunk: false,
        }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn set_window(&mut self, window: u64) {
        self.window = window.max(1);
    }

    /// Whether the one-shot shrink already happened.
    pub fn is_shrunk(&self) -> bool {
        self.shrunk
    }

    /// Every log of `topic` emitted by `address` from `from` (block zero when
    /// absent) up to the current head, in chain order.
    pub async fn iterate_logs<R: LedgerReader + ?Sized>(
        &mut self,
        reader: &R,
        address: Address,
        topic: B256,
        from: Option<BlockId>,
    ) -> Result<Vec<RawLog>, LedgerError> {
        let head = reader.block_number().await?;
        self.iterate_logs_until(reader, address, topic, from, head)
            .await
    }

    /// Like [`iterate_logs`](Self::iterate_logs), bounded by a head the caller
    /// already read. Scans of several topics sharing one `head` cover exactly
    /// the same block range.
    pub async fn iterate_logs_until<R: LedgerReader + ?Sized>(
        &mut self,
        reader: &R,
        address: Address,
        topic: B256,
        from: Option<BlockId>,
        head: u64,
    ) -> Result<Vec<RawLog>, LedgerError> {
        let start = match from {
            None => 0,
            Some(BlockId::Number(n)) => n,
            Some(id @ BlockId::Hash(_)) => reader.get_block(id).await?.number,
        };
        let filter = LogFilter::new(address, topic);

        async {
            loop {
                match self.scan(reader, &filter, start, head).await {
                    Ok(logs) => return Ok(logs),
                    Err(err) if err.is_limit_exceeded() && !self.shrunk => {
                        let reduced = self.window.min(REDUCED_LOG_WINDOW);
                        warn!(
                            from = self.window,
                            to = reduced,
                            error = %err,
                            "log range limit hit, shrinking window and rescanning"
                        );
                        self.window = reduced;
                        self.shrunk = true;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        .instrument(log_scan_span(&topic, start, head))
        .await
    }

    async fn scan<R: LedgerReader + ?Sized>(
        &self,
        reader: &R,
        filter: &LogFilter,
        start: u64,
        head: u64,
    ) -> Result<Vec<RawLog>, LedgerError> {
        let mut logs = Vec::new();
        let mut from = start;
        while from <= head {
            let to = from.saturating_add(self.window - 1).min(head);
            let mut window = reader.query_logs(&filter.range(from, to)).await?;
            debug!(from, to, found = window.len(), "scanned log window");
            logs.append(&mut window);
            if to == u64::MAX {
                break;
            }
            from = to + 1;
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use govsync_nullables::NullLedger;

    const ADDR: Address = Address::new([1; 20]);
    const TOPIC: B256 = B256::new([2; 32]);

    fn ledger_with_logs(blocks: &[u64], head: u64) -> NullLedger {
        let ledger = NullLedger::new();
        for b in blocks {
            ledger.push_log(ADDR, vec![TOPIC], Bytes::new(), *b);
        }
        ledger.set_head(head);
        ledger
    }

    #[tokio::test]
    async fn walks_fixed_windows_up_to_head() {
        let ledger = ledger_with_logs(&[0, 99_999, 100_000, 250_000], 250_000);
        let mut scanner = LogScanner::default();
        let logs = scanner.iterate_logs(&ledger, ADDR, TOPIC, None).await.unwrap();

        assert_eq!(
            ledger.log_queries(),
            vec![(0, 99_999), (100_000, 199_999), (200_000, 250_000)]
        );
        let blocks: Vec<u64> = logs.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![0, 99_999, 100_000, 250_000]);
    }

    #[tokio::test]
    async fn shrinks_once_and_restarts() {
        let ledger = ledger_with_logs(&[10, 2_500], 2_500);
        ledger.limit_log_range(Some(1_000));
        let mut scanner = LogScanner::default();
        let logs = scanner.iterate_logs(&ledger, ADDR, TOPIC, None).await.unwrap();

        assert!(scanner.is_shrunk());
        assert_eq!(scanner.window(), REDUCED_LOG_WINDOW);
        assert_eq!(logs.len(), 2);
        assert_eq!(
            ledger.log_queries(),
            vec![(0, 2_500), (0, 999), (1_000, 1_999), (2_000, 2_500)]
        );
    }

    #[tokio::test]
    async fn second_limit_error_escalates() {
        let ledger = ledger_with_logs(&[10], 5_000);
        ledger.limit_log_range(Some(100));
        let mut scanner = LogScanner::default();
        let err = scanner
            .iterate_logs(&ledger, ADDR, TOPIC, None)
            .await
            .unwrap_err();
        assert!(err.is_limit_exceeded());
        assert_eq!(ledger.log_queries().len(), 2);

        // The shrink is spent for this instance.
        ledger.clear_history();
        assert!(scanner.iterate_logs(&ledger, ADDR, TOPIC, None).await.is_err());
        assert_eq!(ledger.log_queries(), vec![(0, 999)]);
    }

    #[tokio::test]
    async fn resolves_block_hash_start() {
        let ledger = ledger_with_logs(&[5, 40], 60);
        let mut scanner = LogScanner::new(25);
        let from = Some(BlockId::Hash(govsync_nullables::block_hash(30)));
        let logs = scanner.iterate_logs(&ledger, ADDR, TOPIC, from).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(ledger.log_queries(), vec![(30, 54), (55, 60)]);
    }

    #[tokio::test]
    async fn start_past_head_scans_nothing() {
        let ledger = ledger_with_logs(&[], 10);
        let mut scanner = LogScanner::default();
        let logs = scanner
            .iterate_logs(&ledger, ADDR, TOPIC, Some(BlockId::Number(11)))
            .await
            .unwrap();
        assert!(logs.is_empty());
        assert!(ledger.log_queries().is_empty());
    }

    #[tokio::test]
    async fn bounded_scan_stops_at_the_given_head() {
        let ledger = ledger_with_logs(&[5, 40, 70], 70);
        let mut scanner = LogScanner::new(25);
        let logs = scanner
            .iterate_logs_until(&ledger, ADDR, TOPIC, None, 50)
            .await
            .unwrap();
        let blocks: Vec<u64> = logs.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![5, 40]);
        assert_eq!(ledger.log_queries(), vec![(0, 24), (25, 49), (50, 50)]);
    }
}
