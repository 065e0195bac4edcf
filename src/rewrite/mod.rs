//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response
//!     → is_rewritable (HTML content type, identity encoding)
//!     → html.rs (tokens → head/body injection, TOC capture)
//!     → toc.rs (anchor + span extraction → log + metric)
//!     → Return: response with rewritten streaming body
//! ```
//!
//! # Design Decisions
//! - Chunks are rewritten as they arrive; the document is never buffered
//! - `Content-Length` is dropped from rewritten responses
//! - Compressed bodies pass through untouched

pub mod html;
pub mod toc;
pub mod tokenizer;

use std::sync::Arc;

use axum::{
    body::{Body, BodyDataStream, Bytes},
    http::{header, HeaderMap, Response},
};
use futures_util::{stream, StreamExt};

use crate::config::RewriteConfig;
use crate::observability::metrics;

pub use html::{HtmlRewriter, Injections};
pub use toc::{extract_toc, TocEntry};
pub use tokenizer::{Token, TokenKind, Tokenizer};

const HTML_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Applies the HTML rewriting stage to upstream responses.
#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    enabled: bool,
    injections: Arc<Injections>,
}

impl ResponseRewriter {
    pub fn from_config(config: &RewriteConfig) -> Self {
        Self {
            enabled: config.enabled,
            injections: Arc::new(Injections::from_config(config)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a response with `headers` is an uncompressed HTML document.
    pub fn is_rewritable(headers: &HeaderMap) -> bool {
        let is_html = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|mime| {
                let mime = mime.trim();
                HTML_TYPES.iter().any(|t| mime.eq_ignore_ascii_case(t))
            })
            .unwrap_or(false);

        let identity = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().eq_ignore_ascii_case("identity"))
            .unwrap_or(true);

        is_html && identity
    }

    /// Rewrite `response` when it is HTML; anything else passes through.
    pub fn rewrite(&self, response: Response<Body>) -> Response<Body> {
        if !self.enabled || !Self::is_rewritable(response.headers()) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        parts.headers.remove(header::CONTENT_LENGTH);

        let rewriter = HtmlRewriter::new(self.injections.clone());
        let body = Body::from_stream(rewrite_stream(body.into_data_stream(), rewriter));
        Response::from_parts(parts, body)
    }
}

fn rewrite_stream(
    source: BodyDataStream,
    rewriter: HtmlRewriter,
) -> impl futures_util::Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
    stream::unfold(Some((source, rewriter)), |state| async move {
        let (mut source, mut rewriter) = state?;
        loop {
            match source.next().await {
                Some(Ok(chunk)) => {
                    let out = rewriter.write(&chunk);
                    report_toc(rewriter.take_toc());
                    if !out.is_empty() {
                        return Some((Ok(out), Some((source, rewriter))));
                    }
                }
                Some(Err(e)) => return Some((Err(e), None)),
                None => {
                    let out = rewriter.end();
                    report_toc(rewriter.take_toc());
                    return Some((Ok(out), None));
                }
            }
        }
    })
}

fn report_toc(entries: Vec<TocEntry>) {
    if entries.is_empty() {
        return;
    }
    metrics::record_toc_entries(entries.len());
    for entry in entries {
        tracing::info!(label = %entry.label, href = %entry.href, "TOC entry");
    }
}
