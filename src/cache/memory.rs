//! In-process response store.

use async_trait::async_trait;
use moka::future::Cache;

use crate::cache::{CacheKey, CachedResponse, ResponseStore, StoreError};
use crate::config::CacheConfig;

/// Process-wide [`ResponseStore`] backed by moka's LRU + TTL cache.
///
/// The store-wide TTL is the configured `max_age`; each entry additionally
/// expires on its own `Cache-Control` lifetime, checked at lookup.
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<CacheKey, CachedResponse>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.max_age())
            .build();
        Self { cache }
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        let entry = self.cache.get(key).await?;
        if entry.is_fresh() {
            Some(entry)
        } else {
            self.cache.invalidate(key).await;
            None
        }
    }

    async fn store(&self, key: CacheKey, response: CachedResponse) -> Result<(), StoreError> {
        response.freshness_lifetime()?;
        self.cache.insert(key, response).await;
        Ok(())
    }
}
