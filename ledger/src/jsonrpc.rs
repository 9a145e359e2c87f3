//! [`LedgerReader`] over Ethereum JSON-RPC (HTTP).

use crate::reader::{BlockHeader, BlockId, LedgerReader, LogFilter, RawLog};
use crate::LedgerError;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default timeout for a single JSON-RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for an Ethereum-compatible JSON-RPC endpoint.
pub struct JsonRpcReader {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: String,
    hash: B256,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
    log_index: Option<String>,
}

/// Parse a hex quantity such as `"0x1b4"`.
pub fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| LedgerError::InvalidResponse(format!("not a hex quantity: {raw}")))?;
    if digits.is_empty() {
        return Err(LedgerError::InvalidResponse(format!(
            "empty hex quantity: {raw}"
        )));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("bad hex quantity {raw}: {e}")))
}

/// Format a block height as a hex quantity.
pub fn to_quantity(n: u64) -> String {
    format!("0x{n:x}")
}

impl JsonRpcReader {
    /// Create a reader with default timeout settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a reader with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Transport(format!("{method} timed out: {e}"))
                } else if e.is_connect() {
                    LedgerError::Transport(format!("connection failed: {e}"))
                } else {
                    LedgerError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LedgerError::RateLimited(format!("{method}: HTTP 429")));
        }
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: HTTP status {status}"
            )));
        }

        let parsed: RpcResponse<T> = response.json().await.map_err(|e| {
            LedgerError::InvalidResponse(format!("failed to parse {method} response: {e}"))
        })?;

        if let Some(err) = parsed.error {
            let message = match err.data {
                Some(Value::String(data)) if err.code == 3 => format!("{} ({data})", err.message),
                _ => err.message,
            };
            return Err(LedgerError::from_rpc(err.code, message));
        }
        Ok(parsed.result)
    }

    async fn request_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method} returned null")))
    }
}

#[async_trait]
impl LedgerReader for JsonRpcReader {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        let raw: String = self.request_required("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.request_required("eth_getCode", json!([address, "latest"]))
            .await
    }

    async fn get_block(&self, id: BlockId) -> Result<BlockHeader, LedgerError> {
        let block: Option<RpcBlock> = match id {
            BlockId::Number(n) => {
                self.request("eth_getBlockByNumber", json!([to_quantity(n), false]))
                    .await?
            }
            BlockId::Hash(h) => {
                self.request("eth_getBlockByHash", json!([h, false]))
                    .await?
            }
        };
        let block = block.ok_or_else(|| LedgerError::BlockNotFound(id.to_string()))?;
        Ok(BlockHeader {
            number: parse_quantity(&block.number)?,
            hash: block.hash,
            timestamp: parse_quantity(&block.timestamp)?,
        })
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        let params = json!([{
            "address": filter.address,
            "topics": [filter.topic],
            "fromBlock": to_quantity(filter.from_block),
            "toBlock": to_quantity(filter.to_block),
        }]);
        let logs: Vec<RpcLog> = self.request_required("eth_getLogs", params).await?;

        logs.into_iter()
            .map(|log| {
                let block_number = log
                    .block_number
                    .as_deref()
                    .ok_or_else(|| LedgerError::InvalidResponse("pending log in range".into()))
                    .and_then(parse_quantity)?;
                let log_index = log
                    .log_index
                    .as_deref()
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or_default();
                Ok(RawLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    block_number,
                    transaction_hash: log.transaction_hash.unwrap_or_default(),
                    log_index,
                })
            })
            .collect()
    }

    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        tracing::trace!(%target, len = data.len(), "eth_call");
        self.request_required(
            "eth_call",
            json!([{ "to": target, "data": format!("0x{}", hex::encode(&data)) }, "latest"]),
        )
        .await
    }
}
