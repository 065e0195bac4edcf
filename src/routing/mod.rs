//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path + query
//!     → path.rs (split, validate, PathDescriptor)
//!     → upstream.rs (base + remainder + query with hl)
//!     → Return: UpstreamTarget or PathError (403)
//! ```
//!
//! # Design Decisions
//! - One fixed upstream origin; the path never selects a host
//! - Deterministic: same input always produces the same target
//! - Validation fails fast, before any cache or network work

pub mod path;
pub mod upstream;

pub use path::{PathDescriptor, PathError, PathTranslator, DOCS_MARKER};
pub use upstream::{UpstreamTarget, UpstreamUrlBuilder, UpstreamUrlError, LANG_PARAM};
