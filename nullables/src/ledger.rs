//! Nullable ledger: an in-memory chain with scripted contracts.
//!
//! Logs are stored as raw entries and served through the same range filter a
//! node applies. Contract calls are routed to per-address handlers, and calls
//! to the configured aggregator address are emulated the way Multicall's
//! `aggregate` behaves on chain: any failing inner call reverts the whole batch.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use govsync_governance::abi::IMulticall;
use govsync_ledger::{BlockHeader, BlockId, LedgerError, LedgerReader, LogFilter, RawLog};
use std::collections::HashMap;
use std::sync::Mutex;

/// Seconds per block of the synthetic chain.
pub const BLOCK_TIME: u64 = 12;

/// Timestamp of block zero.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Answers calls addressed to one contract. Receives the full call data,
/// selector included.
pub type CallHandler = Box<dyn Fn(&[u8]) -> Result<Bytes, LedgerError> + Send + Sync>;

/// Runtime code that embeds each selector as a `PUSH4` immediate.
pub fn fake_code(selectors: &[[u8; 4]]) -> Bytes {
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for s in selectors {
        code.push(0x63);
        code.extend_from_slice(s);
        code.extend_from_slice(&[0x14, 0x61, 0x00, 0x00, 0x57]);
    }
    code.push(0x00);
    Bytes::from(code)
}

/// Deterministic hash of a synthetic block.
pub fn block_hash(number: u64) -> B256 {
    keccak256([b"block".as_slice(), &number.to_be_bytes()].concat())
}

#[derive(Default)]
struct LedgerState {
    head: u64,
    code: HashMap<Address, Bytes>,
    eth_balances: HashMap<Address, U256>,
    logs: Vec<RawLog>,
    next_tx: u64,
    multicall: Option<Address>,
    fail_aggregate: bool,
    max_log_range: Option<u64>,
    log_queries: Vec<(u64, u64)>,
    calls: Vec<Address>,
    block_lookups: Vec<BlockId>,
}

/// An in-memory [`LedgerReader`] for tests.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullLedger {
    state: Mutex<LedgerState>,
    handlers: Mutex<HashMap<Address, CallHandler>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state.lock().unwrap().code.insert(address, code);
    }

    pub fn set_eth_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().eth_balances.insert(address, balance);
    }

    /// Route calls to `address` through `handler`, replacing any previous one.
    pub fn on_call(&self, address: Address, handler: CallHandler) {
        self.handlers.lock().unwrap().insert(address, handler);
    }

    /// Emulate a Multicall deployment at `address`.
    pub fn deploy_multicall(&self, address: Address) {
        let mut state = self.state.lock().unwrap();
        state.multicall = Some(address);
        state.code.insert(
            address,
            fake_code(&[
                IMulticall::aggregateCall::SELECTOR,
                IMulticall::getEthBalanceCall::SELECTOR,
            ]),
        );
    }

    /// Make every `aggregate` call revert, as on chains without the aggregator.
    pub fn fail_aggregate(&self, fail: bool) {
        self.state.lock().unwrap().fail_aggregate = fail;
    }

    /// Reject log queries spanning more than `blocks` blocks.
    pub fn limit_log_range(&self, blocks: Option<u64>) {
        self.state.lock().unwrap().max_log_range = blocks;
    }

    /// Append a log. Its transaction hash is synthesized and returned.
    pub fn push_log(&self, address: Address, topics: Vec<B256>, data: Bytes, block: u64) -> B256 {
        let mut state = self.state.lock().unwrap();
        state.next_tx += 1;
        let tx = keccak256([b"tx".as_slice(), &state.next_tx.to_be_bytes()].concat());
        let log_index = state.logs.iter().filter(|l| l.block_number == block).count() as u64;
        state.logs.push(RawLog {
            address,
            topics,
            data,
            block_number: block,
            transaction_hash: tx,
            log_index,
        });
        if state.head < block {
            state.head = block;
        }
        tx
    }

    /// Encode and append an ABI event.
    pub fn emit<E: SolEvent>(&self, address: Address, event: &E, block: u64) -> B256 {
        let data = event.encode_log_data();
        self.push_log(address, data.topics().to_vec(), data.data.clone(), block)
    }

    /// Ranges of every log query issued so far.
    pub fn log_queries(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().log_queries.clone()
    }

    /// Targets of every top-level `call` so far.
    pub fn calls(&self) -> Vec<Address> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn block_lookups(&self) -> Vec<BlockId> {
        self.state.lock().unwrap().block_lookups.clone()
    }

    /// Forget recorded queries and calls.
    pub fn clear_history(&self) {
        let mut state = self.state.lock().unwrap();
        state.log_queries.clear();
        state.calls.clear();
        state.block_lookups.clear();
    }

    fn dispatch(&self, target: Address, data: &[u8]) -> Result<Bytes, LedgerError> {
        let (multicall, fail_aggregate) = {
            let state = self.state.lock().unwrap();
            (state.multicall, state.fail_aggregate)
        };
        if Some(target) == multicall {
            return self.multicall(data, fail_aggregate);
        }
        let handlers = self.handlers.lock().unwrap();
        let handler = handlers
            .get(&target)
            .ok_or_else(|| LedgerError::Reverted(format!("no contract at {target}")))?;
        handler(data)
    }

    fn multicall(&self, data: &[u8], fail_aggregate: bool) -> Result<Bytes, LedgerError> {
        let selector = data.get(..4).unwrap_or_default();
        if selector == IMulticall::getEthBalanceCall::SELECTOR.as_slice() {
            let call = IMulticall::getEthBalanceCall::abi_decode(data, true)
                .map_err(|e| LedgerError::Reverted(e.to_string()))?;
            let state = self.state.lock().unwrap();
            let balance = state.eth_balances.get(&call.addr).copied().unwrap_or_default();
            return Ok(Bytes::from((balance,).abi_encode_params()));
        }
        if selector != IMulticall::aggregateCall::SELECTOR.as_slice() {
            return Err(LedgerError::Reverted("unknown multicall selector".into()));
        }
        if fail_aggregate {
            return Err(LedgerError::Reverted("aggregate unavailable".into()));
        }
        let call = IMulticall::aggregateCall::abi_decode(data, true)
            .map_err(|e| LedgerError::Reverted(e.to_string()))?;
        let mut results = Vec::with_capacity(call.calls.len());
        for inner in &call.calls {
            let out = self
                .dispatch(inner.target, &inner.callData)
                .map_err(|e| LedgerError::Reverted(format!("Multicall aggregate: call failed: {e}")))?;
            results.push(out);
        }
        let head = U256::from(self.head());
        Ok(Bytes::from((head, results).abi_encode_params()))
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerReader for NullLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.head())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.block_lookups.push(id);
        let head = state.head;
        let number = match id {
            BlockId::Number(n) => (n <= head).then_some(n),
            BlockId::Hash(h) => (0..=head).find(|n| block_hash(*n) == h),
        }
        .ok_or_else(|| LedgerError::BlockNotFound(id.to_string()))?;
        Ok(BlockHeader {
            number,
            hash: block_hash(number),
            timestamp: GENESIS_TIME + number * BLOCK_TIME,
        })
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.log_queries.push((filter.from_block, filter.to_block));
        if let Some(max) = state.max_log_range {
            let span = filter.to_block.saturating_sub(filter.from_block) + 1;
            if span > max {
                return Err(LedgerError::LimitExceeded(format!(
                    "block range {span} exceeds {max}"
                )));
            }
        }
        let mut logs: Vec<RawLog> = state
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.topics.first() == Some(&filter.topic)
                    && (filter.from_block..=filter.to_block).contains(&log.block_number)
            })
            .cloned()
            .collect();
        logs.sort_by_key(RawLog::position);
        Ok(logs)
    }

    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        self.state.lock().unwrap().calls.push(target);
        self.dispatch(target, &data)
    }
}
