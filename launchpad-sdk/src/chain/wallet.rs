use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{RpcTransport, WalletSigner};
use crate::core::{SdkResult, TransactionRequest};

/// Wallet reached through `eth_sendTransaction` on a signing endpoint
/// (a wallet bridge or a node holding the account).
pub struct JsonRpcWallet {
    transport: Arc<RpcTransport>,
    from: Address,
}

impl JsonRpcWallet {
    pub fn new(transport: Arc<RpcTransport>, from: Address) -> Self {
        Self { transport, from }
    }
}

#[async_trait]
impl WalletSigner for JsonRpcWallet {
    fn address(&self) -> Address {
        self.from
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> SdkResult<TxHash> {
        let mut body = json!({
            "from": self.from,
            "to": tx.to,
            "data": tx.data,
        });
        if tx.value > U256::ZERO {
            body["value"] = json!(tx.value);
        }

        let hash: TxHash = self
            .transport
            .call_required("eth_sendTransaction", json!([body]))
            .await?;

        info!(%hash, to = %tx.to, "Transaction sent");
        Ok(hash)
    }
}
