//! Seams to the chain node and the wallet
//!
//! The trading services only talk to these traits, so they can run against
//! a JSON-RPC node in production and an in-memory double in tests.

pub mod rpc;
pub mod wallet;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::core::{PoolReference, ReceiptLog, Reserves, SdkResult, TransactionRequest, TxReceipt};

pub use rpc::{JsonRpcChain, RpcTransport};
pub use wallet::JsonRpcWallet;

/// Read-only access to pool and token contracts
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn current_price(&self, pool: PoolReference) -> SdkResult<U256>;

    async fn reserves(&self, pool: PoolReference) -> SdkResult<Reserves>;

    /// Tokens received for `eth_amount` of native coin
    async fn buy_return(&self, pool: PoolReference, eth_amount: U256) -> SdkResult<U256>;

    /// Native coin received for `token_amount` of tokens
    async fn sell_return(&self, pool: PoolReference, token_amount: U256) -> SdkResult<U256>;

    async fn eth_balance(&self, owner: Address) -> SdkResult<U256>;

    async fn token_balance(&self, token: Address, owner: Address) -> SdkResult<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> SdkResult<U256>;

    async fn total_supply(&self, token: Address) -> SdkResult<U256>;

    /// `None` while the transaction is not mined yet
    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>>;

    /// Logs of a mined transaction; `NotFound` while it is not mined
    async fn transaction_logs(&self, hash: TxHash) -> SdkResult<Vec<ReceiptLog>>;

    async fn block_number(&self) -> SdkResult<u64>;
}

/// The user's wallet. Only one request may be presented to it at a time.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Ask the wallet to sign and broadcast. Fails with
    /// [`SdkError::UserRejected`](crate::core::SdkError::UserRejected) when the owner declines.
    async fn send_transaction(&self, tx: TransactionRequest) -> SdkResult<TxHash>;
}
