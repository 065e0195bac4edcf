//! Localized documentation reverse proxy.
//!
//! Serves `GET /{lang}/docs/...` from a single upstream documentation origin
//! with the language forced through `hl`, caches responses at the edge, and
//! optionally rewrites HTML so the table of contents is visible on wide
//! viewports.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod rewrite;
pub mod routing;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, SetupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{DocsProxy, Handled};
