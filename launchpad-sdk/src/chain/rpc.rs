//! Lightweight JSON-RPC client for EVM nodes
//!
//! Implements only the handful of methods the trading flow needs instead of
//! pulling in a full provider stack.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::{Address, Bytes, TxHash, B256, U256, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use super::ChainReader;
use crate::{
    core::{PoolReference, ReceiptLog, Reserves, SdkError, SdkResult, TxReceipt},
    protocol::contracts::{IERC20, ILiquidityPool},
};

/// EIP-1193 "User Rejected Request"
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: Option<U64>,
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

#[derive(Debug, Deserialize)]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
}

/// Shared HTTP transport speaking JSON-RPC 2.0
pub struct RpcTransport {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call. A `null` result comes back as `None`.
    pub async fn call<T>(&self, method: &str, params: Value) -> SdkResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        debug!(method, id, "RPC call");

        let response = self.http.post(&self.url).json(&request_body).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_response(status, &body)
    }

    /// Like [`call`](Self::call) but treats a `null` result as an error
    pub async fn call_required<T>(&self, method: &str, params: Value) -> SdkResult<T>
    where
        T: DeserializeOwned,
    {
        self.call(method, params)
            .await?
            .ok_or_else(|| SdkError::Decode(format!("No result in {} response", method)))
    }
}

/// A JSON-RPC error in the body wins over the HTTP status, so wallet
/// bridges that answer rejections with a 4xx still map to `UserRejected`.
fn decode_response<T>(status: reqwest::StatusCode, body: &[u8]) -> SdkResult<Option<T>>
where
    T: DeserializeOwned,
{
    match serde_json::from_slice::<RpcResponse<T>>(body) {
        Ok(RpcResponse { error: Some(error), .. }) => Err(map_rpc_error(error.code, error.message)),
        Ok(response) if status.is_success() => Ok(response.result),
        Ok(_) => Err(SdkError::Network(format!("HTTP status {}", status))),
        Err(_) if !status.is_success() => Err(SdkError::Network(format!("HTTP status {}", status))),
        Err(e) => Err(e.into()),
    }
}

fn map_rpc_error(code: i64, message: String) -> SdkError {
    let lowered = message.to_lowercase();
    if code == USER_REJECTED_CODE || lowered.contains("user rejected") || lowered.contains("user denied") {
        SdkError::UserRejected
    } else {
        SdkError::Rpc { code, message }
    }
}

/// [`ChainReader`] backed by a JSON-RPC node
pub struct JsonRpcChain {
    transport: Arc<RpcTransport>,
}

impl JsonRpcChain {
    pub fn new(transport: Arc<RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<RpcTransport> {
        &self.transport
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> SdkResult<Bytes> {
        let params = json!([{ "to": to, "data": Bytes::from(data) }, "latest"]);
        self.transport.call_required("eth_call", params).await
    }
}

#[async_trait]
impl ChainReader for JsonRpcChain {
    async fn current_price(&self, pool: PoolReference) -> SdkResult<U256> {
        let data = ILiquidityPool::getCurrentTokenPriceCall {}.abi_encode();
        let raw = self.eth_call(pool.address(), data).await?;
        Ok(ILiquidityPool::getCurrentTokenPriceCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn reserves(&self, pool: PoolReference) -> SdkResult<Reserves> {
        let data = ILiquidityPool::getReservesCall {}.abi_encode();
        let raw = self.eth_call(pool.address(), data).await?;
        let decoded = ILiquidityPool::getReservesCall::abi_decode_returns(&raw, true)?;
        Ok(Reserves {
            token: decoded._0,
            native: decoded._1,
        })
    }

    async fn buy_return(&self, pool: PoolReference, eth_amount: U256) -> SdkResult<U256> {
        let data = ILiquidityPool::calculateCurvedBuyReturnCall { ethAmount: eth_amount }.abi_encode();
        let raw = self.eth_call(pool.address(), data).await?;
        Ok(ILiquidityPool::calculateCurvedBuyReturnCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn sell_return(&self, pool: PoolReference, token_amount: U256) -> SdkResult<U256> {
        let data = ILiquidityPool::calculateCurvedSellReturnCall { tokenAmount: token_amount }.abi_encode();
        let raw = self.eth_call(pool.address(), data).await?;
        Ok(ILiquidityPool::calculateCurvedSellReturnCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn eth_balance(&self, owner: Address) -> SdkResult<U256> {
        self.transport
            .call_required("eth_getBalance", json!([owner, "latest"]))
            .await
    }

    async fn token_balance(&self, token: Address, owner: Address) -> SdkResult<U256> {
        let data = IERC20::balanceOfCall { account: owner }.abi_encode();
        let raw = self.eth_call(token, data).await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> SdkResult<U256> {
        let data = IERC20::allowanceCall { owner, spender }.abi_encode();
        let raw = self.eth_call(token, data).await?;
        Ok(IERC20::allowanceCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn total_supply(&self, token: Address) -> SdkResult<U256> {
        let data = IERC20::totalSupplyCall {}.abi_encode();
        let raw = self.eth_call(token, data).await?;
        Ok(IERC20::totalSupplyCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .transport
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;

        Ok(receipt.and_then(|r| {
            // Some nodes return pending receipts without a block number
            let block_number = r.block_number?.to::<u64>();
            Some(TxReceipt {
                hash: r.transaction_hash,
                block_number,
                success: r.status.map_or(true, |s| s == U64::from(1u64)),
            })
        }))
    }

    async fn transaction_logs(&self, hash: TxHash) -> SdkResult<Vec<ReceiptLog>> {
        let receipt: RpcReceipt = self
            .transport
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?
            .ok_or_else(|| SdkError::NotFound(format!("receipt for {}", hash)))?;

        Ok(receipt
            .logs
            .into_iter()
            .map(|log| ReceiptLog {
                address: log.address,
                topics: log.topics,
                data: log.data,
            })
            .collect())
    }

    async fn block_number(&self) -> SdkResult<u64> {
        let number: U64 = self.transport.call_required("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes_map_to_user_rejected() {
        assert_eq!(map_rpc_error(4001, "whatever".into()), SdkError::UserRejected);
        assert_eq!(
            map_rpc_error(-32000, "User denied transaction signature".into()),
            SdkError::UserRejected
        );
        assert_eq!(
            map_rpc_error(-32000, "insufficient funds".into()),
            SdkError::Rpc {
                code: -32000,
                message: "insufficient funds".into()
            }
        );
    }

    #[test]
    fn test_receipt_deserialization() {
        let raw = json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0"
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.block_number, Some(U64::from(16u64)));
        assert_eq!(receipt.status, Some(U64::ZERO));
        assert!(receipt.logs.is_empty());

        let with_logs: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "logs": [{
                "address": "0x2a0b34a43b477fa9355ac2c8e54da3c57067ddf4",
                "topics": [format!("0x{}", "01".repeat(32))],
                "data": "0x1234"
            }]
        }))
        .unwrap();
        assert_eq!(with_logs.logs.len(), 1);
        assert_eq!(with_logs.logs[0].data, Bytes::from(vec![0x12, 0x34]));
    }

    #[test]
    fn test_rejection_in_body_beats_http_status() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": 4001, "message": "User rejected the request." }
        })
        .to_string();

        let result = decode_response::<TxHash>(reqwest::StatusCode::BAD_REQUEST, body.as_bytes());
        assert_eq!(result, Err(SdkError::UserRejected));
    }

    #[test]
    fn test_http_status_used_when_body_has_no_error() {
        let result = decode_response::<U64>(reqwest::StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert!(matches!(result, Err(SdkError::Network(_))));

        let ok = json!({ "jsonrpc": "2.0", "id": 1, "result": "0x10" }).to_string();
        assert_eq!(
            decode_response::<U64>(reqwest::StatusCode::OK, ok.as_bytes()),
            Ok(Some(U64::from(16u64)))
        );
        assert!(matches!(
            decode_response::<U64>(reqwest::StatusCode::OK, b"not json"),
            Err(SdkError::Decode(_))
        ));
    }
}
