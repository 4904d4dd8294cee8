//! Client configuration
//!
//! Loaded from an optional TOML file layered with `LAUNCHPAD_*` environment
//! variables (`LAUNCHPAD_ENDPOINTS__RPC_URL=...`). Every field has a default
//! pointing at the testnet deployment.

use std::{path::Path, time::Duration};

use alloy_primitives::Address;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    client::{session::SessionConfig, watcher::WatchConfig},
    core::{
        constants::{
            BONDING_CURVE_MANAGER, DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS, PRICE_CACHE_TTL, QUOTE_DEBOUNCE,
            RECEIPT_MAX_ATTEMPTS, RECEIPT_POLL_INTERVAL, REQUIRED_CONFIRMATIONS,
        },
        SdkError, SdkResult,
    },
};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "LAUNCHPAD";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchpadConfig {
    pub endpoints: EndpointConfig,
    pub contracts: ContractConfig,
    pub trading: TradingConfig,
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Node used for reads and receipts
    pub rpc_url: String,
    /// Endpoint that answers `eth_sendTransaction` for the user's account
    pub wallet_url: String,
    /// Subgraph GraphQL endpoint
    pub indexer_url: String,
    /// Base URL of the metadata REST backend
    pub metadata_url: String,
    pub explorer_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_connect_project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub bonding_curve_manager: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub default_slippage_bps: u16,
    pub quote_debounce_ms: u64,
    pub price_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
    pub confirmations: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://public-node.testnet.rsk.co".to_string(),
            wallet_url: "http://localhost:8545".to_string(),
            indexer_url: "http://35.234.119.105:8000/subgraphs/name/likeaser-testnet".to_string(),
            metadata_url: "https://likeaserback.onrender.com".to_string(),
            explorer_url: "https://rootstock-testnet.blockscout.com".to_string(),
            request_timeout_secs: 30,
            wallet_connect_project_id: None,
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            bonding_curve_manager: BONDING_CURVE_MANAGER,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            quote_debounce_ms: QUOTE_DEBOUNCE.as_millis() as u64,
            price_cache_ttl_secs: PRICE_CACHE_TTL.as_secs(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: RECEIPT_POLL_INTERVAL.as_secs(),
            max_attempts: RECEIPT_MAX_ATTEMPTS,
            confirmations: REQUIRED_CONFIRMATIONS,
        }
    }
}

impl LaunchpadConfig {
    /// Load from `path` (if it exists) and the environment, then validate
    pub fn load(path: Option<&Path>) -> SdkResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, then validate
    pub fn from_toml(content: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| SdkError::Config(format!("failed to write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> SdkResult<()> {
        let endpoints = [
            ("endpoints.rpc_url", &self.endpoints.rpc_url),
            ("endpoints.wallet_url", &self.endpoints.wallet_url),
            ("endpoints.indexer_url", &self.endpoints.indexer_url),
            ("endpoints.metadata_url", &self.endpoints.metadata_url),
            ("endpoints.explorer_url", &self.endpoints.explorer_url),
        ];
        for (name, url) in endpoints {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SdkError::Config(format!("{} must be an http(s) URL, got {:?}", name, url)));
            }
        }

        if self.endpoints.request_timeout_secs == 0 {
            return Err(SdkError::Config("endpoints.request_timeout_secs must be greater than 0".into()));
        }
        if self.trading.default_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(SdkError::Config(format!(
                "trading.default_slippage_bps must be at most {}",
                MAX_SLIPPAGE_BPS
            )));
        }
        if self.watcher.poll_interval_secs == 0 {
            return Err(SdkError::Config("watcher.poll_interval_secs must be greater than 0".into()));
        }
        if self.watcher.max_attempts == 0 {
            return Err(SdkError::Config("watcher.max_attempts must be greater than 0".into()));
        }
        if self.watcher.confirmations == 0 {
            return Err(SdkError::Config("watcher.confirmations must be at least 1".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoints.request_timeout_secs)
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.trading.price_cache_ttl_secs)
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_secs(self.watcher.poll_interval_secs),
            max_attempts: self.watcher.max_attempts,
            confirmations: self.watcher.confirmations,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(self.trading.quote_debounce_ms),
            watch: self.watch_config(),
            slippage_bps: self.trading.default_slippage_bps,
        }
    }
}
