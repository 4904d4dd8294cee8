//! Subgraph (GraphQL) client for token and trade records

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::types::{Page, RawTokenCreated, RawTransaction, TokenSummary, TokenTransaction};
use crate::{
    client::pools::PoolLookup,
    core::{PoolReference, SdkError, SdkResult},
};

const TOKEN_FIELDS: &str = "id name symbol pool { id } blockNumber blockTimestamp transactionHash";

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenList {
    token_createds: Vec<RawTokenCreated>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleToken {
    token_created: Option<RawTokenCreated>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenWithTransactions {
    token_created: Option<RawTokenCreated>,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct PoolId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TokenPoolEntity {
    pool: Option<PoolId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPool {
    token_created: Option<TokenPoolEntity>,
}

/// Client for the indexing backend
pub struct IndexerClient {
    url: String,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.into(), http })
    }

    async fn query<T>(&self, query: &str, variables: Value) -> SdkResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(url = %self.url, "GraphQL query");

        let response: GraphQlResponse<T> = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            error!(errors = ?messages, "GraphQL errors");
            return Err(SdkError::Network(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| SdkError::Decode("GraphQL response without data".into()))
    }

    /// All launched tokens. Backend errors degrade to an empty page.
    pub async fn all_tokens(&self, page: u32, page_size: u32) -> SdkResult<Page<TokenSummary>> {
        let query = format!(
            "query GetAllTokens($first: Int, $skip: Int) {{ tokenCreateds(first: $first, skip: $skip) {{ {} }} }}",
            TOKEN_FIELDS
        );
        let variables = json!({ "first": page_size, "skip": skip(page, page_size) });

        match self.query::<TokenList>(&query, variables).await {
            Ok(list) => to_page(list.token_createds, page, page_size),
            Err(e) => {
                error!(error = %e, "Error fetching tokens");
                Ok(Page::empty(page))
            }
        }
    }

    /// Tokens created within the last `hours`, newest first
    pub async fn recent_tokens(&self, page: u32, page_size: u32, hours: u32) -> SdkResult<Page<TokenSummary>> {
        self.recent_tokens_at(page, page_size, hours, Utc::now()).await
    }

    pub async fn recent_tokens_at(
        &self,
        page: u32,
        page_size: u32,
        hours: u32,
        now: DateTime<Utc>,
    ) -> SdkResult<Page<TokenSummary>> {
        let query = format!(
            "query GetRecentTokens($first: Int!, $skip: Int!, $timestamp: BigInt!) {{ \
             tokenCreateds(first: $first, skip: $skip, where: {{ blockTimestamp_gt: $timestamp }}, \
             orderBy: blockTimestamp, orderDirection: desc) {{ {} }} }}",
            TOKEN_FIELDS
        );
        let since = now.timestamp() - i64::from(hours) * 3600;
        let variables = json!({
            "first": page_size,
            "skip": skip(page, page_size),
            "timestamp": since.to_string(),
        });

        let list: TokenList = self.query(&query, variables).await?;
        to_page(list.token_createds, page, page_size)
    }

    /// Case-insensitive match on name or symbol
    pub async fn search_tokens(&self, search: &str, page: u32, page_size: u32) -> SdkResult<Page<TokenSummary>> {
        let query = format!(
            "query SearchTokens($first: Int!, $skip: Int!, $searchQuery: String!) {{ \
             tokenCreateds(first: $first, skip: $skip, where: {{ or: [ \
             {{ name_contains_nocase: $searchQuery }}, {{ symbol_contains_nocase: $searchQuery }} ] }}, \
             orderBy: blockTimestamp, orderDirection: desc) {{ {} }} }}",
            TOKEN_FIELDS
        );
        let variables = json!({
            "first": page_size,
            "skip": skip(page, page_size),
            "searchQuery": search,
        });

        let list: TokenList = self.query(&query, variables).await?;
        to_page(list.token_createds, page, page_size)
    }

    pub async fn token(&self, address: Address) -> SdkResult<TokenSummary> {
        let query = format!(
            "query GetToken($address: String!) {{ tokenCreated(id: $address) {{ {} }} }}",
            TOKEN_FIELDS
        );
        let single: SingleToken = self.query(&query, json!({ "address": subgraph_id(address) })).await?;
        single
            .token_created
            .ok_or_else(|| SdkError::NotFound(format!("token {}", address)))?
            .try_into()
    }

    /// Token record plus one page of its trades, newest first
    pub async fn token_with_transactions(
        &self,
        address: Address,
        page: u32,
        page_size: u32,
    ) -> SdkResult<(TokenSummary, Page<TokenTransaction>)> {
        let query = format!(
            "query GetTokenInfoAndTransactions($address: String!, $first: Int!, $skip: Int!) {{ \
             tokenCreated(id: $address) {{ {} }} \
             transactions: transactions(first: $first, skip: $skip, where: {{ token: $address }}, \
             orderBy: timestamp, orderDirection: desc) {{ \
             id type senderAddress recipientAddress ethAmountAfterTax tokenAmount tokenPrice \
             txHash timestamp pool {{ id }} tax }} }}",
            TOKEN_FIELDS
        );
        let variables = json!({
            "address": subgraph_id(address),
            "first": page_size,
            "skip": skip(page, page_size),
        });

        let result: TokenWithTransactions = self.query(&query, variables).await?;
        let token: TokenSummary = result
            .token_created
            .ok_or_else(|| SdkError::NotFound(format!("token {}", address)))?
            .try_into()?;
        let transactions = result
            .transactions
            .into_iter()
            .map(TokenTransaction::try_from)
            .collect::<SdkResult<Vec<_>>>()?;

        Ok((token, Page::from_items(transactions, page, page_size)))
    }

    /// Pool backing `token`
    pub async fn token_pool(&self, token: Address) -> SdkResult<PoolReference> {
        let query = "query GetTokenPool($address: String!) { tokenCreated(id: $address) { pool { id } } }";
        let result: TokenPool = self.query(query, json!({ "address": subgraph_id(token) })).await?;

        let id = result
            .token_created
            .and_then(|t| t.pool)
            .ok_or_else(|| SdkError::NotFound(format!("pool for token {}", token)))?
            .id;
        super::types::parse_address(&id).map(PoolReference)
    }
}

#[async_trait]
impl PoolLookup for IndexerClient {
    async fn lookup_pool(&self, token: Address) -> SdkResult<PoolReference> {
        self.token_pool(token).await
    }
}

/// The subgraph keys entities by lowercase hex
fn subgraph_id(address: Address) -> String {
    format!("{:#x}", address)
}

fn skip(page: u32, page_size: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(page_size)
}

fn to_page(raw: Vec<RawTokenCreated>, page: u32, page_size: u32) -> SdkResult<Page<TokenSummary>> {
    let tokens = raw
        .into_iter()
        .map(TokenSummary::try_from)
        .collect::<SdkResult<Vec<_>>>()?;
    Ok(Page::from_items(tokens, page, page_size))
}
