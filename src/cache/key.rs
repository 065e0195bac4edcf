//! Cache key derivation.

use std::fmt;

use axum::http::{header, Request};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The full inbound URL (scheme, host, path, query), used verbatim.
///
/// No normalization: URLs that differ only in query order are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Reconstruct the absolute inbound URL of `request`.
    ///
    /// Server requests usually carry only path and query in the request line,
    /// so scheme and host come from `X-Forwarded-Proto` and `Host`.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request.uri();
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Self(uri.to_string());
        }

        let headers = request.headers();
        let scheme = headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        Self(format!("{scheme}://{host}{path_and_query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_host_header() {
        let req = Request::builder()
            .uri("/zh-CN/docs/quickstart?foo=bar")
            .header("Host", "proxy.example.com")
            .body(())
            .unwrap();
        assert_eq!(
            CacheKey::from_request(&req).as_str(),
            "http://proxy.example.com/zh-CN/docs/quickstart?foo=bar"
        );
    }

    #[test]
    fn test_key_honors_forwarded_proto() {
        let req = Request::builder()
            .uri("/en/docs")
            .header("Host", "proxy.example.com")
            .header("X-Forwarded-Proto", "https")
            .body(())
            .unwrap();
        assert_eq!(CacheKey::from_request(&req).as_str(), "https://proxy.example.com/en/docs");
    }

    #[test]
    fn test_absolute_request_uri_is_used_as_is() {
        let req = Request::builder()
            .uri("https://edge.example.com/en/docs/models?b=2&a=1")
            .body(())
            .unwrap();
        assert_eq!(
            CacheKey::from_request(&req).as_str(),
            "https://edge.example.com/en/docs/models?b=2&a=1"
        );
    }

    #[test]
    fn test_query_order_is_significant() {
        let a = Request::builder().uri("http://h/en/docs?a=1&b=2").body(()).unwrap();
        let b = Request::builder().uri("http://h/en/docs?b=2&a=1").body(()).unwrap();
        assert_ne!(CacheKey::from_request(&a), CacheKey::from_request(&b));
    }
}
