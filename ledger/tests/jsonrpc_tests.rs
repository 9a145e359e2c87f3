//! HTTP-level tests of the JSON-RPC reader against a mock endpoint.

use alloy_primitives::{Address, Bytes, B256};
use govsync_ledger::{BlockId, JsonRpcReader, LedgerError, LedgerReader, LogFilter};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_result(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result,
            })),
        )
        .mount(server)
        .await;
}

async fn mock_error(server: &MockServer, rpc_method: &str, code: i64, message: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": code, "message": message },
            })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn reads_block_number() {
    let server = MockServer::start().await;
    mock_result(&server, "eth_blockNumber", json!("0x3d0900")).await;

    let reader = JsonRpcReader::new(server.uri());
    assert_eq!(reader.block_number().await.unwrap(), 4_000_000);
}

#[tokio::test]
async fn reads_block_header_by_number() {
    let server = MockServer::start().await;
    mock_result(
        &server,
        "eth_getBlockByNumber",
        json!({
            "number": "0x64",
            "hash": B256::repeat_byte(0xab),
            "timestamp": "0x65f00000",
        }),
    )
    .await;

    let reader = JsonRpcReader::new(server.uri());
    let header = reader.get_block(BlockId::Number(100)).await.unwrap();
    assert_eq!(header.number, 100);
    assert_eq!(header.hash, B256::repeat_byte(0xab));
    assert_eq!(header.timestamp, 0x65f0_0000);
}

#[tokio::test]
async fn missing_block_is_block_not_found() {
    let server = MockServer::start().await;
    mock_result(&server, "eth_getBlockByHash", serde_json::Value::Null).await;

    let reader = JsonRpcReader::new(server.uri());
    let err = reader
        .get_block(BlockId::Hash(B256::repeat_byte(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::BlockNotFound(_)));
}

#[tokio::test]
async fn decodes_logs() {
    let server = MockServer::start().await;
    let governor = Address::repeat_byte(0x11);
    mock_result(
        &server,
        "eth_getLogs",
        json!([{
            "address": governor,
            "topics": [B256::repeat_byte(0x22)],
            "data": "0x0102",
            "blockNumber": "0xa",
            "transactionHash": B256::repeat_byte(0x33),
            "logIndex": "0x1",
        }]),
    )
    .await;

    let reader = JsonRpcReader::new(server.uri());
    let filter = LogFilter::new(governor, B256::repeat_byte(0x22)).range(0, 100);
    let logs = reader.query_logs(&filter).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].block_number, 10);
    assert_eq!(logs[0].log_index, 1);
    assert_eq!(logs[0].data, Bytes::from(vec![1u8, 2]));
    assert_eq!(logs[0].transaction_hash, B256::repeat_byte(0x33));
}

#[tokio::test]
async fn too_much_data_maps_to_limit_exceeded() {
    let server = MockServer::start().await;
    mock_error(
        &server,
        "eth_getLogs",
        -32005,
        "query returned more than 10000 results",
    )
    .await;

    let reader = JsonRpcReader::new(server.uri());
    let filter = LogFilter::new(Address::ZERO, B256::ZERO).range(0, 1_000_000);
    let err = reader.query_logs(&filter).await.unwrap_err();
    assert!(err.is_limit_exceeded());
}

#[tokio::test]
async fn revert_maps_to_reverted() {
    let server = MockServer::start().await;
    mock_error(&server, "eth_call", 3, "execution reverted").await;

    let reader = JsonRpcReader::new(server.uri());
    let err = reader
        .call(Address::repeat_byte(1), Bytes::from(vec![0u8; 4]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Reverted(_)));
}

#[tokio::test]
async fn http_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let reader = JsonRpcReader::new(server.uri());
    let err = reader.block_number().await.unwrap_err();
    assert!(matches!(err, LedgerError::RateLimited(_)));
}
