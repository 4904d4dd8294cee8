//! In-memory chain and wallet doubles
//!
//! Used by the unit tests and the integration tests to drive the trading
//! flow without a node.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;

use crate::{
    chain::{ChainReader, WalletSigner},
    core::{PoolReference, ReceiptLog, Reserves, SdkError, SdkResult, TransactionRequest, TxReceipt},
    protocol::contracts::IBondingCurveManager,
};

/// Read operations that can be counted or made to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Read {
    Price,
    Reserves,
    BuyReturn,
    SellReturn,
    EthBalance,
    TokenBalance,
    Allowance,
    TotalSupply,
    Receipt,
    Logs,
    BlockNumber,
}

struct ChainState {
    price: U256,
    reserves: Reserves,
    /// Output per unit of input, as (numerator, denominator)
    buy_rate: (u64, u64),
    sell_rate: (u64, u64),
    quote_delays: HashMap<U256, Duration>,
    eth_balance: U256,
    token_balance: U256,
    allowance: U256,
    total_supply: U256,
    block_number: u64,
    receipts: HashMap<TxHash, TxReceipt>,
    /// Receipt becomes visible after this many polls
    receipt_after_polls: HashMap<TxHash, u32>,
    receipt_polls: HashMap<TxHash, u32>,
    logs: HashMap<TxHash, Vec<ReceiptLog>>,
    read_delays: HashMap<Read, Duration>,
    failing: HashSet<Read>,
    calls: HashMap<Read, usize>,
}

/// Scriptable [`ChainReader`]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                price: U256::from(1_000_000_000u64),
                reserves: Reserves::default(),
                buy_rate: (1_000, 1),
                sell_rate: (1, 1_000),
                quote_delays: HashMap::new(),
                eth_balance: U256::ZERO,
                token_balance: U256::ZERO,
                allowance: U256::ZERO,
                total_supply: U256::ZERO,
                block_number: 1,
                receipts: HashMap::new(),
                receipt_after_polls: HashMap::new(),
                receipt_polls: HashMap::new(),
                logs: HashMap::new(),
                read_delays: HashMap::new(),
                failing: HashSet::new(),
                calls: HashMap::new(),
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Wait out any scripted delay, count the call and fail it if scripted to
    async fn enter(&self, read: Read) -> SdkResult<()> {
        if let Some(delay) = self.with_state(|s| s.read_delays.get(&read).copied()) {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            *s.calls.entry(read).or_default() += 1;
            if s.failing.contains(&read) {
                Err(SdkError::Network(format!("{:?} unavailable", read)))
            } else {
                Ok(())
            }
        })
    }

    pub fn calls(&self, read: Read) -> usize {
        self.with_state(|s| s.calls.get(&read).copied().unwrap_or(0))
    }

    pub fn fail(&self, read: Read) {
        self.with_state(|s| s.failing.insert(read));
    }

    pub fn recover(&self, read: Read) {
        self.with_state(|s| s.failing.remove(&read));
    }

    /// Make every `read` take `delay` to answer
    pub fn delay_read(&self, read: Read, delay: Duration) {
        self.with_state(|s| s.read_delays.insert(read, delay));
    }

    pub fn set_price(&self, price: U256) {
        self.with_state(|s| s.price = price);
    }

    pub fn set_reserves(&self, reserves: Reserves) {
        self.with_state(|s| s.reserves = reserves);
    }

    pub fn set_buy_rate(&self, numerator: u64, denominator: u64) {
        self.with_state(|s| s.buy_rate = (numerator, denominator));
    }

    pub fn set_sell_rate(&self, numerator: u64, denominator: u64) {
        self.with_state(|s| s.sell_rate = (numerator, denominator));
    }

    /// Make quotes for `amount` take `delay` to answer
    pub fn delay_quote(&self, amount: U256, delay: Duration) {
        self.with_state(|s| s.quote_delays.insert(amount, delay));
    }

    pub fn set_balances(&self, eth: U256, token: U256, allowance: U256) {
        self.with_state(|s| {
            s.eth_balance = eth;
            s.token_balance = token;
            s.allowance = allowance;
        });
    }

    pub fn set_allowance(&self, allowance: U256) {
        self.with_state(|s| s.allowance = allowance);
    }

    pub fn set_total_supply(&self, supply: U256) {
        self.with_state(|s| s.total_supply = supply);
    }

    pub fn set_block_number(&self, block: u64) {
        self.with_state(|s| s.block_number = block);
    }

    /// Include a transaction in `block`
    pub fn mine(&self, hash: TxHash, block: u64, success: bool) {
        self.with_state(|s| {
            s.receipts.insert(
                hash,
                TxReceipt {
                    hash,
                    block_number: block,
                    success,
                },
            );
        });
    }

    /// Logs returned for a mined `hash`
    pub fn set_logs(&self, hash: TxHash, logs: Vec<ReceiptLog>) {
        self.with_state(|s| s.logs.insert(hash, logs));
    }

    /// Hide the receipt of `hash` for the first `polls` receipt requests
    pub fn reveal_after(&self, hash: TxHash, polls: u32) {
        self.with_state(|s| s.receipt_after_polls.insert(hash, polls));
    }

    fn quote(&self, read: Read, amount: U256) -> (Option<Duration>, U256) {
        self.with_state(|s| {
            let (num, den) = if read == Read::BuyReturn { s.buy_rate } else { s.sell_rate };
            let out = amount * U256::from(num) / U256::from(den);
            (s.quote_delays.get(&amount).copied(), out)
        })
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn current_price(&self, _pool: PoolReference) -> SdkResult<U256> {
        self.enter(Read::Price).await?;
        Ok(self.with_state(|s| s.price))
    }

    async fn reserves(&self, _pool: PoolReference) -> SdkResult<Reserves> {
        self.enter(Read::Reserves).await?;
        Ok(self.with_state(|s| s.reserves))
    }

    async fn buy_return(&self, _pool: PoolReference, eth_amount: U256) -> SdkResult<U256> {
        let (delay, out) = self.quote(Read::BuyReturn, eth_amount);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(Read::BuyReturn).await?;
        Ok(out)
    }

    async fn sell_return(&self, _pool: PoolReference, token_amount: U256) -> SdkResult<U256> {
        let (delay, out) = self.quote(Read::SellReturn, token_amount);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(Read::SellReturn).await?;
        Ok(out)
    }

    async fn eth_balance(&self, _owner: Address) -> SdkResult<U256> {
        self.enter(Read::EthBalance).await?;
        Ok(self.with_state(|s| s.eth_balance))
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> SdkResult<U256> {
        self.enter(Read::TokenBalance).await?;
        Ok(self.with_state(|s| s.token_balance))
    }

    async fn allowance(&self, _token: Address, _owner: Address, _spender: Address) -> SdkResult<U256> {
        self.enter(Read::Allowance).await?;
        Ok(self.with_state(|s| s.allowance))
    }

    async fn total_supply(&self, _token: Address) -> SdkResult<U256> {
        self.enter(Read::TotalSupply).await?;
        Ok(self.with_state(|s| s.total_supply))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>> {
        self.enter(Read::Receipt).await?;
        Ok(self.with_state(|s| {
            let polls = s.receipt_polls.entry(hash).or_default();
            *polls += 1;
            let hidden_for = s.receipt_after_polls.get(&hash).copied().unwrap_or(0);
            if *polls <= hidden_for {
                None
            } else {
                s.receipts.get(&hash).copied()
            }
        }))
    }

    async fn transaction_logs(&self, hash: TxHash) -> SdkResult<Vec<ReceiptLog>> {
        self.enter(Read::Logs).await?;
        self.with_state(|s| {
            if !s.receipts.contains_key(&hash) {
                return Err(SdkError::NotFound(format!("receipt for {}", hash)));
            }
            Ok(s.logs.get(&hash).cloned().unwrap_or_default())
        })
    }

    async fn block_number(&self) -> SdkResult<u64> {
        self.enter(Read::BlockNumber).await?;
        Ok(self.with_state(|s| s.block_number))
    }
}

#[derive(Default)]
struct WalletState {
    sent: Vec<TransactionRequest>,
    next_error: Option<SdkError>,
    sign_delay: Option<Duration>,
    nonce: u8,
}

/// Scriptable [`WalletSigner`]; hashes are `0x00..01`, `0x00..02`, ...
pub struct MockWallet {
    address: Address,
    state: Mutex<WalletState>,
}

impl MockWallet {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: Mutex::new(WalletState::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut WalletState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// The owner declines the next request
    pub fn reject_next(&self) {
        self.with_state(|s| s.next_error = Some(SdkError::UserRejected));
    }

    pub fn fail_next(&self, error: SdkError) {
        self.with_state(|s| s.next_error = Some(error));
    }

    /// Keep each request open for `delay` before answering
    pub fn set_sign_delay(&self, delay: Duration) {
        self.with_state(|s| s.sign_delay = Some(delay));
    }

    /// Number of requests that reached the wallet
    pub fn calls(&self) -> usize {
        self.with_state(|s| s.sent.len())
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.with_state(|s| s.sent.clone())
    }

    /// Hash the wallet will hand out for its `n`-th request (1-based)
    pub fn hash_for(n: u8) -> TxHash {
        B256::with_last_byte(n)
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> SdkResult<TxHash> {
        let delay = self.with_state(|s| {
            s.sent.push(tx);
            s.sign_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| match s.next_error.take() {
            Some(error) => Err(error),
            None => {
                s.nonce += 1;
                Ok(Self::hash_for(s.nonce))
            }
        })
    }
}

/// `TokenCreated` log as the manager at `manager` would emit it
pub fn token_created_log(
    manager: Address,
    token: Address,
    creator: Address,
    pool: PoolReference,
    name: &str,
    symbol: &str,
) -> ReceiptLog {
    let event = IBondingCurveManager::TokenCreated {
        tokenAddress: token,
        creator,
        name: name.to_string(),
        symbol: symbol.to_string(),
        poolAddress: pool.address(),
    };
    ReceiptLog {
        address: manager,
        topics: vec![
            IBondingCurveManager::TokenCreated::SIGNATURE_HASH,
            B256::left_padding_from(token.as_slice()),
            B256::left_padding_from(creator.as_slice()),
        ],
        data: Bytes::from(event.encode_data()),
    }
}
