//! Upstream fetching subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamTarget + inbound headers
//!     → headers.rs (forwarding policy)
//!     → fetcher.rs (GET, no redirects, header deadline)
//!     → headers.rs (strip hop-by-hop)
//!     → Return: streamed response or FetchError
//! ```
//!
//! # Design Decisions
//! - No retries: a failed fetch becomes a 502 at the pipeline boundary
//! - The upstream body is never buffered here

pub mod fetcher;
pub mod headers;

pub use fetcher::{FetchError, UpstreamFetcher};
pub use headers::{forwarded_headers, strip_hop_by_hop};
