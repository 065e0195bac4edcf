//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upstream documentation origin the proxy fronts by default.
pub const DEFAULT_UPSTREAM_BASE: &str = "https://ai.google.dev/gemini-api/docs";

/// Root configuration for the documentation proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Server-side timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream origin and fetch policy.
    pub upstream: UpstreamConfig,

    /// Inbound path validation.
    pub routing: RoutingConfig,

    /// Edge response cache.
    pub cache: CacheConfig,

    /// HTML rewriting.
    pub rewrite: RewriteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests in flight at once (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for the server side of the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline enforced by the server layer, in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for pending cache writes, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            drain_secs: 10,
        }
    }
}

/// Which inbound headers are sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// `User-Agent` and `Accept` only.
    #[default]
    Minimal,
    /// Impersonate a browser: also `Accept-Language` and `Cookie`, plus fixed
    /// `Referer`, `Origin`, `Cache-Control` and `Pragma`.
    Browser,
}

/// What the client sees when upstream answers with a 4xx/5xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatusMode {
    /// Replace the upstream response with a plain-text 502.
    #[default]
    BadGateway,
    /// Return the upstream status and body unchanged.
    PassThrough,
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute base URL; remainder paths are appended to it.
    pub base_url: String,

    /// Deadline for receiving upstream response headers, in seconds.
    pub timeout_secs: u64,

    /// Header forwarding policy.
    pub header_policy: HeaderPolicy,

    /// Handling of non-success upstream statuses.
    pub on_error_status: ErrorStatusMode,
}

impl UpstreamConfig {
    /// Fetch deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE.to_string(),
            timeout_secs: 30,
            header_policy: HeaderPolicy::default(),
            on_error_status: ErrorStatusMode::default(),
        }
    }
}

/// How strictly inbound paths are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathValidation {
    /// At least three segments with `docs` at index 2.
    #[default]
    Loose,
    /// Loose rules plus at most two segments after `docs`, each `[A-Za-z0-9-]+`.
    Strict,
}

/// Routing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub validation: PathValidation,
}

/// Edge cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the response cache.
    pub enabled: bool,

    /// Maximum number of cached responses.
    pub max_entries: u64,

    /// `max-age` advertised on proxied responses and honored by the store.
    pub max_age_secs: u64,
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            max_age_secs: 3600,
        }
    }
}

/// HTML rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Enable the rewriting stage for HTML responses.
    pub enabled: bool,

    /// Width forced through the injected viewport meta tag.
    pub viewport_width: u32,

    /// Minimum viewport width at which the head stylesheet applies.
    pub min_width_px: u32,

    /// CSS selectors of the table-of-contents elements forced visible.
    pub toc_selectors: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            viewport_width: 1920,
            min_width_px: 1024,
            toc_selectors: vec![
                "devsite-toc".to_string(),
                ".devsite-toc".to_string(),
                "devsite-toc .devsite-nav-list".to_string(),
                "devsite-toc .devsite-nav-item".to_string(),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
