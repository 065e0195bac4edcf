//! Upstream HTTP client.

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Response},
};
use url::Url;

use crate::config::{HeaderPolicy, UpstreamConfig};
use crate::observability::metrics;
use crate::routing::UpstreamTarget;
use crate::upstream::headers::{forwarded_headers, strip_hop_by_hop};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Issues GET requests against the documentation origin.
///
/// Redirects are never followed; the deadline covers the time until response
/// headers arrive, and the body is streamed through afterwards. A request
/// that misses the deadline is dropped, which closes its connection.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
    timeout: Duration,
    policy: HeaderPolicy,
    origin: Url,
}

impl UpstreamFetcher {
    pub fn new(config: &UpstreamConfig, origin: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            policy: config.header_policy,
            origin,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `target`, forwarding the allowed subset of `inbound` headers.
    ///
    /// Any status, including 3xx and 4xx/5xx, is a successful fetch; the
    /// caller decides what to do with it.
    pub async fn fetch(
        &self,
        target: &UpstreamTarget,
        inbound: &HeaderMap,
    ) -> Result<Response<Body>, FetchError> {
        let request = self
            .client
            .get(target.url.clone())
            .headers(forwarded_headers(self.policy, inbound, &self.origin));

        let upstream = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                metrics::record_upstream_fetch("network");
                return Err(FetchError::Network(e));
            }
            Err(_) => {
                metrics::record_upstream_fetch("timeout");
                return Err(FetchError::Timeout(self.timeout));
            }
        };

        let status = upstream.status();
        metrics::record_upstream_fetch(if status.is_client_error() || status.is_server_error() {
            "status"
        } else {
            "ok"
        });
        tracing::debug!(target_url = %target.url, status = status.as_u16(), "Upstream responded");

        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
