//! Header forwarding policy.
//!
//! # Responsibilities
//! - Pick the inbound headers that travel upstream
//! - Strip hop-by-hop headers from upstream responses
//!
//! # Design Decisions
//! - Allow-list, not deny-list: anything not named here stays behind
//! - Missing `User-Agent` is sent as an empty value, missing `Accept` as `*/*`

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::HeaderPolicy;

/// Headers that describe one connection, not the message.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

/// Build the upstream request headers for `policy`.
///
/// `origin` supplies the fixed `Referer`/`Origin` values of the browser policy.
pub fn forwarded_headers(policy: HeaderPolicy, inbound: &HeaderMap, origin: &Url) -> HeaderMap {
    let mut out = HeaderMap::new();

    let user_agent = inbound
        .get(header::USER_AGENT)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let accept = inbound
        .get(header::ACCEPT)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*/*"));
    out.insert(header::USER_AGENT, user_agent);
    out.insert(header::ACCEPT, accept);

    if policy == HeaderPolicy::Browser {
        for name in [header::ACCEPT_LANGUAGE, header::COOKIE] {
            if let Some(value) = inbound.get(&name) {
                out.insert(name, value.clone());
            }
        }

        let origin = origin.origin().ascii_serialization();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            out.insert(header::ORIGIN, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
            out.insert(header::REFERER, value);
        }
        out.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        out.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    }

    out
}

/// Remove connection-scoped headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
}
