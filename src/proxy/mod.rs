//! Pipeline orchestration.
//!
//! # Data Flow
//! ```text
//! Request
//!     → method check (405)
//!     → routing::PathTranslator (403)
//!     → cache::CacheGateway::lookup ── hit ──→ stored response
//!     → routing::UpstreamUrlBuilder
//!     → upstream::UpstreamFetcher (502 on timeout / network / status)
//!     → rewrite::ResponseRewriter
//!     → edge headers (Cache-Control, CORS)
//!     → cache::CacheGateway::populate (background)
//!     → Return: Handled { response, background }
//! ```

pub mod pipeline;

pub use pipeline::{DocsProxy, Handled};
