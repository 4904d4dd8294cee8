//! Records returned by the indexing, metadata and explorer backends

use std::str::FromStr;

use alloy_primitives::{Address, TxHash, U256};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{PoolReference, SdkError, SdkResult};

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Page whose counts are derived from the items themselves, the way the
    /// subgraph listings report them
    pub fn from_items(data: Vec<T>, current_page: u32, page_size: u32) -> Self {
        let total_count = data.len() as u64;
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size as u64) as u32
        };
        Self {
            data,
            total_count,
            current_page,
            total_pages,
        }
    }

    pub fn empty(current_page: u32) -> Self {
        Self {
            data: Vec::new(),
            total_count: 0,
            current_page,
            total_pages: 0,
        }
    }
}

/// A launched token as indexed from `TokenCreated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub pool: Option<PoolReference>,
    pub block_number: u64,
    pub created_at: DateTime<Utc>,
    pub creation_tx: Option<TxHash>,
}

/// A buy or sell recorded by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTransaction {
    pub id: String,
    pub kind: String,
    pub sender: Option<Address>,
    pub recipient: Option<Address>,
    pub eth_amount: U256,
    pub token_amount: U256,
    pub token_price: U256,
    pub tx_hash: Option<TxHash>,
    pub timestamp: DateTime<Utc>,
    pub pool: Option<PoolReference>,
    pub tax: U256,
}

/// Off-chain presentation data kept by the metadata backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

/// Token as stored by the metadata backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedToken {
    pub address: Address,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub creator_address: Option<Address>,
    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

/// A trade recorded by the metadata backend for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressTransaction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub token_address: Option<Address>,
    #[serde(default)]
    pub eth_amount: Option<String>,
    #[serde(default)]
    pub token_amount: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<TxHash>,
    pub timestamp: DateTime<Utc>,
}

/// Token listed together with its DEX liquidity provision events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenWithLiquidity {
    #[serde(flatten)]
    pub token: ListedToken,
    #[serde(default)]
    pub liquidity_events: Vec<LiquidityEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityEvent {
    pub id: String,
    #[serde(default)]
    pub eth_amount: Option<String>,
    #[serde(default)]
    pub token_amount: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Entry of the backend's address book of launched tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAddress {
    pub address: Address,
    pub symbol: String,
}

/// Message in a token's chat thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub user: Address,
    pub token: Address,
    pub message: String,
    /// Id of the message this one answers
    #[serde(default)]
    pub reply_to: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Body of a new chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChatMessage {
    pub user: Address,
    pub token: Address,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
}

/// Token detail view: indexed record and one page of its trades
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDetail {
    pub token: TokenSummary,
    pub transactions: Page<TokenTransaction>,
}

/// Price point in wei as stored by the metadata backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPrice {
    pub token_price: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdPricePoint {
    pub token_price_usd: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    /// Unix seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenHolder {
    pub address: Address,
    pub balance: U256,
}

// Raw subgraph shapes

/// `pool` is either a plain id or an `{ id }` entity depending on the schema
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPool {
    Id(String),
    Entity { id: String },
}

impl RawPool {
    fn id(&self) -> &str {
        match self {
            RawPool::Id(id) | RawPool::Entity { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTokenCreated {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub pool: Option<RawPool>,
    pub block_number: Option<String>,
    pub block_timestamp: String,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_address: Option<String>,
    pub recipient_address: Option<String>,
    pub eth_amount_after_tax: Option<String>,
    pub token_amount: Option<String>,
    pub token_price: Option<String>,
    pub tx_hash: Option<String>,
    pub timestamp: String,
    pub pool: Option<RawPool>,
    pub tax: Option<String>,
}

impl TryFrom<RawTokenCreated> for TokenSummary {
    type Error = SdkError;

    fn try_from(raw: RawTokenCreated) -> SdkResult<Self> {
        Ok(TokenSummary {
            address: parse_address(&raw.id)?,
            name: raw.name,
            symbol: raw.symbol,
            pool: raw.pool.as_ref().map(|p| parse_address(p.id()).map(PoolReference)).transpose()?,
            block_number: raw.block_number.as_deref().map(parse_u64).transpose()?.unwrap_or(0),
            created_at: parse_unix_seconds(&raw.block_timestamp)?,
            creation_tx: raw.transaction_hash.as_deref().map(parse_hash).transpose()?,
        })
    }
}

impl TryFrom<RawTransaction> for TokenTransaction {
    type Error = SdkError;

    fn try_from(raw: RawTransaction) -> SdkResult<Self> {
        Ok(TokenTransaction {
            id: raw.id,
            kind: raw.kind,
            sender: raw.sender_address.as_deref().map(parse_address).transpose()?,
            recipient: raw.recipient_address.as_deref().map(parse_address).transpose()?,
            eth_amount: parse_amount(raw.eth_amount_after_tax.as_deref())?,
            token_amount: parse_amount(raw.token_amount.as_deref())?,
            token_price: parse_amount(raw.token_price.as_deref())?,
            tx_hash: raw.tx_hash.as_deref().map(parse_hash).transpose()?,
            timestamp: parse_unix_seconds(&raw.timestamp)?,
            pool: raw.pool.as_ref().map(|p| parse_address(p.id()).map(PoolReference)).transpose()?,
            tax: parse_amount(raw.tax.as_deref())?,
        })
    }
}

pub(crate) fn parse_address(value: &str) -> SdkResult<Address> {
    Address::from_str(value).map_err(|e| SdkError::Decode(format!("invalid address {:?}: {}", value, e)))
}

fn parse_hash(value: &str) -> SdkResult<TxHash> {
    TxHash::from_str(value).map_err(|e| SdkError::Decode(format!("invalid hash {:?}: {}", value, e)))
}

fn parse_u64(value: &str) -> SdkResult<u64> {
    value
        .parse()
        .map_err(|e| SdkError::Decode(format!("invalid number {:?}: {}", value, e)))
}

/// Subgraph BigInt (decimal string); missing means zero
pub(crate) fn parse_amount(value: Option<&str>) -> SdkResult<U256> {
    match value {
        None => Ok(U256::ZERO),
        Some(s) => U256::from_str(s).map_err(|e| SdkError::Decode(format!("invalid amount {:?}: {}", s, e))),
    }
}

fn parse_unix_seconds(value: &str) -> SdkResult<DateTime<Utc>> {
    let secs: i64 = value
        .parse()
        .map_err(|e| SdkError::Decode(format!("invalid timestamp {:?}: {}", value, e)))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| SdkError::Decode(format!("timestamp out of range: {}", secs)))
}
