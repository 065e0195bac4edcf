//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use docs_proxy::cache::{CacheKey, CachedResponse, MemoryStore, ResponseStore, StoreError};
use docs_proxy::config::{CacheConfig, ProxyConfig};
use wiremock::MockServer;

/// Upstream base path mounted on the mock server.
pub const BASE_PATH: &str = "/gemini-api/docs";

/// Config pointing at `server`, with a short upstream timeout.
pub fn test_config(server: &MockServer) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("{}{}", server.uri(), BASE_PATH);
    config.upstream.timeout_secs = 5;
    config
}

/// GET request for `uri` as a client reaching `proxy.test` would send it.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Host", "proxy.test")
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// In-memory store that counts lookups, hits and writes.
#[derive(Clone)]
pub struct CountingStore {
    inner: MemoryStore,
    lookups: Arc<AtomicUsize>,
    hits: Arc<AtomicUsize>,
    stores: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(&CacheConfig::default()),
            lookups: Arc::new(AtomicUsize::new(0)),
            hits: Arc::new(AtomicUsize::new(0)),
            stores: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseStore for CountingStore {
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let hit = self.inner.lookup(key).await;
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        hit
    }

    async fn store(&self, key: CacheKey, response: CachedResponse) -> Result<(), StoreError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, response).await
    }
}
