//! Edge response cache.
//!
//! # Data Flow
//! ```text
//! Inbound URL → key.rs (CacheKey, verbatim)
//!     → CacheGateway::lookup → ResponseStore::lookup → hit: CachedResponse
//!                                                   → miss: pipeline fetches
//! Final response → CacheGateway::populate
//!     → tee.rs (client copy + cached copy, background task)
//!     → ResponseStore::store (refuses uncacheable entries)
//! ```
//!
//! # Design Decisions
//! - The store is injected behind [`ResponseStore`]; [`MemoryStore`] is the
//!   process-wide default
//! - No single-flight: concurrent misses for one key each fetch, and the last
//!   store wins
//! - Store failures are logged and counted, never returned to the client

pub mod entry;
pub mod key;
pub mod memory;
mod tee;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Response};

use crate::config::CacheConfig;
use crate::lifecycle::BackgroundTask;
use crate::observability::metrics;

pub use entry::{freshness_lifetime, CachedResponse};
pub use key::CacheKey;
pub use memory::MemoryStore;

/// Why a response was not persisted.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("partial content is not cacheable")]
    PartialContent,

    #[error("responses with Vary: * are not cacheable")]
    VaryWildcard,

    #[error("Cache-Control: {0} forbids storing")]
    NotStorable(&'static str),

    #[error("response carries no positive max-age")]
    NoFreshness,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Key-value response storage used by the [`CacheGateway`].
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Fresh entry for `key`, if any.
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse>;

    /// Persist `response` under `key`, replacing any previous entry.
    async fn store(&self, key: CacheKey, response: CachedResponse) -> Result<(), StoreError>;
}

/// Read-through access to the response store.
#[derive(Clone)]
pub struct CacheGateway {
    store: Option<Arc<dyn ResponseStore>>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A gateway that always misses and never stores.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(Arc::new(MemoryStore::new(config)))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        let store = self.store.as_ref()?;
        let hit = store.lookup(key).await;
        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    /// Schedule storing `response` under `key`.
    ///
    /// Returns the response to hand to the client and, when a store happens,
    /// the background task performing it. Responses the store would refuse
    /// are returned untouched without a task.
    pub fn populate(
        &self,
        key: CacheKey,
        response: Response<Body>,
    ) -> (Response<Body>, Option<BackgroundTask>) {
        let Some(store) = &self.store else {
            return (response, None);
        };

        if let Err(e) = freshness_lifetime(response.status(), response.headers()) {
            tracing::debug!(cache_key = %key, reason = %e, "Response not cacheable");
            metrics::record_cache_store("rejected");
            return (response, None);
        }

        let (response, task) = tee::tee_into_store(store.clone(), key, response);
        (response, Some(task))
    }
}
