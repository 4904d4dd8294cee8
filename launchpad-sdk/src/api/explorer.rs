//! Block explorer queries and links

use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use serde::Deserialize;
use tracing::debug;

use super::types::{parse_address, TokenHolder};
use crate::core::{SdkError, SdkResult};

#[derive(Debug, Deserialize)]
struct HoldersResponse {
    items: Vec<HolderItem>,
}

#[derive(Debug, Deserialize)]
struct HolderItem {
    address: HolderAddress,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HolderAddress {
    hash: String,
}

pub struct ExplorerClient {
    base_url: String,
    http: reqwest::Client,
}

impl ExplorerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// First page of holders as reported by the explorer
    pub async fn holders(&self, token: Address) -> SdkResult<Vec<TokenHolder>> {
        let url = format!("{}/api/v2/tokens/{}/holders", self.base_url, token);
        debug!(%url, "Fetching token holders");

        let response: HoldersResponse = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        response
            .items
            .into_iter()
            .map(|item| {
                Ok(TokenHolder {
                    address: parse_address(&item.address.hash)?,
                    balance: item
                        .value
                        .parse::<U256>()
                        .map_err(|e| SdkError::Decode(format!("invalid balance {:?}: {}", item.value, e)))?,
                })
            })
            .collect()
    }

    pub fn tx_url(&self, hash: TxHash) -> String {
        format!("{}/tx/{}", self.base_url, hash)
    }

    pub fn address_url(&self, address: Address) -> String {
        format!("{}/address/{}", self.base_url, address)
    }
}

/// One page of an already fetched list, 1-based
pub fn page_slice<T>(items: &[T], page: u32, per_page: u32) -> &[T] {
    let per_page = per_page as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}
