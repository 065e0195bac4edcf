//! Metrics collection and exposition.
//!
//! # Metrics
//! - `docs_proxy_requests_total` (counter): requests by response status
//! - `docs_proxy_request_duration_seconds` (histogram): handler latency
//! - `docs_proxy_cache_lookups_total` (counter): `result` = hit | miss
//! - `docs_proxy_cache_stores_total` (counter): `result` = ok | rejected | aborted
//! - `docs_proxy_upstream_fetches_total` (counter): `outcome` = ok | status | timeout | network
//! - `docs_proxy_toc_entries_total` (counter): table-of-contents links observed
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "docs_proxy_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "docs_proxy_request_duration_seconds";
pub const CACHE_LOOKUPS_TOTAL: &str = "docs_proxy_cache_lookups_total";
pub const CACHE_STORES_TOTAL: &str = "docs_proxy_cache_stores_total";
pub const UPSTREAM_FETCHES_TOTAL: &str = "docs_proxy_upstream_fetches_total";
pub const TOC_ENTRIES_TOTAL: &str = "docs_proxy_toc_entries_total";

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    ::metrics::counter!(REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
    ::metrics::histogram!(REQUEST_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!(CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn record_cache_store(result: &'static str) {
    ::metrics::counter!(CACHE_STORES_TOTAL, "result" => result).increment(1);
}

pub fn record_upstream_fetch(outcome: &'static str) {
    ::metrics::counter!(UPSTREAM_FETCHES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_toc_entries(count: usize) {
    ::metrics::counter!(TOC_ENTRIES_TOTAL).increment(count as u64);
}
