use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::debug;

use crate::core::{PoolReference, SdkResult};

/// Resolves the bonding-curve pool that backs a token
#[async_trait]
pub trait PoolLookup: Send + Sync {
    async fn lookup_pool(&self, token: Address) -> SdkResult<PoolReference>;
}

/// Caches token to pool resolution for the lifetime of the client
pub struct PoolDirectory {
    lookup: Arc<dyn PoolLookup>,
    cache: Mutex<HashMap<Address, PoolReference>>,
}

impl PoolDirectory {
    pub fn new(lookup: Arc<dyn PoolLookup>) -> Self {
        Self {
            lookup,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn pool_for(&self, token: Address) -> SdkResult<PoolReference> {
        if let Some(pool) = self.cached(token) {
            return Ok(pool);
        }

        let pool = self.lookup.lookup_pool(token).await?;
        debug!(%token, %pool, "Resolved pool");
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token, pool);
        Ok(pool)
    }

    /// Seed the cache, e.g. from a listing that already carried the pool
    pub fn insert(&self, token: Address, pool: PoolReference) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token, pool);
    }

    pub fn cached(&self, token: Address) -> Option<PoolReference> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&token)
            .copied()
    }
}
