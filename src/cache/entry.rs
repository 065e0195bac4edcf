//! Cached response representation and freshness rules.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Response, StatusCode},
};

use crate::cache::StoreError;

/// A fully buffered response as persisted by a [`ResponseStore`](crate::cache::ResponseStore).
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    stored_at: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }

    /// Lifetime granted by the response's own `Cache-Control`.
    pub fn freshness_lifetime(&self) -> Result<Duration, StoreError> {
        freshness_lifetime(self.status, &self.headers)
    }

    /// Whether the entry is still within its `max-age` at `now`.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        match self.freshness_lifetime() {
            Ok(lifetime) => now.saturating_duration_since(self.stored_at) < lifetime,
            Err(_) => false,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Rebuild a response exactly as it was stored.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Lifetime a shared edge cache would grant a response with these parts.
///
/// Refuses partial content, `Vary: *`, `no-store`/`private`, and responses
/// without a positive `max-age`/`s-maxage`.
pub fn freshness_lifetime(status: StatusCode, headers: &HeaderMap) -> Result<Duration, StoreError> {
    if status == StatusCode::PARTIAL_CONTENT {
        return Err(StoreError::PartialContent);
    }
    let vary_any = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| v.trim() == "*");
    if vary_any {
        return Err(StoreError::VaryWildcard);
    }

    let directives = CacheDirectives::parse(headers);
    if directives.no_store {
        return Err(StoreError::NotStorable("no-store"));
    }
    if directives.private {
        return Err(StoreError::NotStorable("private"));
    }
    match directives.s_maxage.or(directives.max_age) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(StoreError::NoFreshness),
    }
}

/// The `Cache-Control` directives the store cares about.
#[derive(Debug, Default, PartialEq, Eq)]
struct CacheDirectives {
    no_store: bool,
    private: bool,
    max_age: Option<u64>,
    s_maxage: Option<u64>,
}

impl CacheDirectives {
    fn parse(headers: &HeaderMap) -> Self {
        let mut out = Self::default();
        let values = headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok());

        for directive in values.flat_map(|v| v.split(',')) {
            let directive = directive.trim().to_ascii_lowercase();
            let (name, value) = match directive.split_once('=') {
                Some((n, v)) => (n.trim().to_string(), Some(v.trim().trim_matches('"').to_string())),
                None => (directive.clone(), None),
            };
            match (name.as_str(), value) {
                ("no-store", _) => out.no_store = true,
                ("private", _) => out.private = true,
                ("max-age", Some(v)) => out.max_age = v.parse().ok(),
                ("s-maxage", Some(v)) => out.s_maxage = v.parse().ok(),
                _ => {}
            }
        }
        out
    }
}
