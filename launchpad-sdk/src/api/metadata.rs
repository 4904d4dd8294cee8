//! REST client for the metadata backend

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, U256};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, error};

use super::types::{
    AddressTransaction, ChatMessage, HistoricalPrice, ListedToken, NewChatMessage, Page, TokenAddress, TokenMetadata,
    TokenWithLiquidity, UsdPricePoint,
};
use crate::{
    cache::{Clock, SystemClock, TtlCache},
    core::{constants::PRICE_CACHE_TTL, SdkError, SdkResult},
    protocol::wei_to_f64,
};

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: u64,
}

pub struct MetadataClient {
    base_url: String,
    http: reqwest::Client,
    eth_price: TtlCache<f64>,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        Self::with_price_cache(base_url, timeout, PRICE_CACHE_TTL, Arc::new(SystemClock))
    }

    pub fn with_price_cache(
        base_url: impl Into<String>,
        timeout: Duration,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> SdkResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            eth_price: TtlCache::with_clock(ttl, clock),
        })
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> SdkResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self.http.get(&url).query(query).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SdkError::NotFound(path.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Recorded price points in wei, oldest first
    pub async fn historical_prices(&self, token: Address) -> SdkResult<Vec<HistoricalPrice>> {
        self.get(&format!("/api/tokens/address/{}/historical-prices", token), &[])
            .await
    }

    /// ETH/USD price, served from cache while younger than the TTL
    pub async fn native_usd_price(&self) -> SdkResult<f64> {
        if let Some(price) = self.eth_price.get() {
            return Ok(price);
        }

        let response: PriceResponse = self.get("/api/price", &[]).await.map_err(|e| {
            error!(error = %e, "Error fetching current price");
            e
        })?;
        let price = response
            .price
            .trim()
            .parse::<f64>()
            .map_err(|e| SdkError::Decode(format!("invalid price {:?}: {}", response.price, e)))?;

        self.eth_price.put(price);
        Ok(price)
    }

    /// Price history converted to USD
    pub async fn usd_price_history(&self, token: Address) -> SdkResult<Vec<UsdPricePoint>> {
        let (eth_usd, prices) = tokio::try_join!(self.native_usd_price(), self.historical_prices(token))?;
        to_usd_history(&prices, eth_usd)
    }

    /// Overwrite the off-chain presentation fields of `token`
    pub async fn update_token(&self, token: Address, metadata: &TokenMetadata) -> SdkResult<ListedToken> {
        let url = format!("{}/api/tokens/update/{}", self.base_url, token);
        debug!(%url, "PATCH");

        let updated = self
            .http
            .patch(&url)
            .json(metadata)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(updated)
    }

    /// Trades sent or received by `address`
    pub async fn transactions_by_address(
        &self,
        address: Address,
        page: u32,
        page_size: u32,
    ) -> SdkResult<Page<AddressTransaction>> {
        self.get(
            &format!("/api/transactions/address/{}", address),
            &paging(page, page_size),
        )
        .await
    }

    /// Tokens that already reached the DEX, with their liquidity events
    pub async fn tokens_with_liquidity(&self, page: u32, page_size: u32) -> SdkResult<Page<TokenWithLiquidity>> {
        self.get("/api/tokens/with-liquidityEvent", &paging(page, page_size))
            .await
    }

    /// Address and symbol of every launched token
    pub async fn token_addresses(&self) -> SdkResult<Vec<TokenAddress>> {
        self.get("/api/tokens/addresses", &[]).await
    }

    /// Chat thread of `token`, oldest first
    pub async fn chat_messages(&self, token: Address) -> SdkResult<Vec<ChatMessage>> {
        self.get("/chats", &[("token", token.to_string())]).await
    }

    /// Post to a token's chat; returns the new message id
    pub async fn post_chat_message(&self, message: &NewChatMessage) -> SdkResult<u64> {
        if message.message.trim().is_empty() {
            return Err(SdkError::Validation("chat message is empty".into()));
        }
        let url = format!("{}/chats", self.base_url);
        debug!(%url, token = %message.token, "POST");

        let created: CreatedResponse = self
            .http
            .post(&url)
            .json(message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created.id)
    }

    pub async fn tokens_by_creator(&self, creator: Address, page: u32, page_size: u32) -> SdkResult<Page<ListedToken>> {
        self.get(&format!("/api/tokens/creator/{}", creator), &paging(page, page_size))
            .await
    }
}

fn paging(page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("pageSize", page_size.to_string())]
}

/// Convert wei price points into USD using a single ETH/USD rate.
/// Values are rounded to 9 decimal places.
pub fn to_usd_history(prices: &[HistoricalPrice], eth_usd: f64) -> SdkResult<Vec<UsdPricePoint>> {
    prices
        .iter()
        .map(|point| {
            let wei = point
                .token_price
                .parse::<U256>()
                .map_err(|e| SdkError::Decode(format!("invalid price {:?}: {}", point.token_price, e)))?;
            let usd = wei_to_f64(wei)? * eth_usd;
            Ok(UsdPricePoint {
                token_price_usd: (usd * 1e9).round() / 1e9,
                timestamp: point.timestamp,
            })
        })
        .collect()
}
