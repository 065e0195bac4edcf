//! Streaming HTML rewriter.
//!
//! # Responsibilities
//! - Append the viewport meta tag and a TOC stylesheet to `<head>`
//! - Append a second TOC stylesheet to `<body>`
//! - Capture the markup inside `<devsite-toc>` for link extraction
//!
//! # Design Decisions
//! - Driven by [`Tokenizer`] tokens; state is keyed on element name only
//! - Output is emitted as soon as a token is complete; nothing is held back
//!   except a partially received tag
//! - Appending means inserting before the closing tag. A `<head>` closed
//!   implicitly gets its content before `<body>`; unclosed elements get it at
//!   `</html>` or end of input
//! - Elements absent from the source are not synthesized

use std::sync::Arc;

use axum::body::Bytes;

use crate::config::RewriteConfig;
use crate::rewrite::toc::{extract_toc, TocEntry};
use crate::rewrite::tokenizer::Tokenizer;

/// Upper bound on captured TOC markup per element.
const MAX_TOC_MARKUP: usize = 1024 * 1024;

const TOC_ELEMENT: &str = "devsite-toc";

/// Markup appended to `<head>` and `<body>`.
#[derive(Debug, Clone)]
pub struct Injections {
    pub head: String,
    pub body: String,
}

impl Injections {
    pub fn from_config(config: &RewriteConfig) -> Self {
        let selectors = config.toc_selectors.join(", ");
        let head = format!(
            "<meta name=\"viewport\" content=\"width={width}\">\
             <style>@media screen and (min-width: {min}px) {{ {selectors} {{ \
             display: block !important; opacity: 1 !important; visibility: visible !important; \
             width: auto !important; height: auto !important; }} }}</style>",
            width = config.viewport_width,
            min = config.min_width_px,
        );
        let body = format!(
            "<style>{selectors} {{ display: block !important; visibility: visible !important; }}</style>"
        );
        Self { head, body }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Element not seen yet.
    Pending,
    /// Inside the element; content still owed.
    Open,
    Injected,
}

#[derive(Debug, Default)]
struct TocCapture {
    depth: usize,
    markup: Vec<u8>,
    truncated: bool,
}

impl TocCapture {
    fn push(&mut self, raw: &[u8]) {
        if self.markup.len() + raw.len() > MAX_TOC_MARKUP {
            self.truncated = true;
            return;
        }
        self.markup.extend_from_slice(raw);
    }
}

/// Rewrites one HTML document fed to it in chunks.
#[derive(Debug)]
pub struct HtmlRewriter {
    tokenizer: Tokenizer,
    injections: Arc<Injections>,
    head: Slot,
    body: Slot,
    toc: Option<TocCapture>,
    entries: Vec<TocEntry>,
}

impl HtmlRewriter {
    pub fn new(injections: Arc<Injections>) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            injections,
            head: Slot::Pending,
            body: Slot::Pending,
            toc: None,
            entries: Vec::new(),
        }
    }

    /// Rewrite the next chunk, returning whatever output is ready.
    pub fn write(&mut self, chunk: &[u8]) -> Bytes {
        self.tokenizer.feed(chunk);
        self.drain()
    }

    /// Flush remaining input and any content still owed.
    pub fn end(&mut self) -> Bytes {
        self.tokenizer.finish();
        let mut out = self.drain().to_vec();
        self.close_head(&mut out);
        self.close_body(&mut out);
        self.finish_toc();
        Bytes::from(out)
    }

    /// TOC entries found so far, leaving none behind.
    pub fn take_toc(&mut self) -> Vec<TocEntry> {
        std::mem::take(&mut self.entries)
    }

    fn drain(&mut self) -> Bytes {
        let mut out = Vec::new();
        while let Some(token) = self.tokenizer.next_token() {
            if token.is_start("head") && self.head == Slot::Pending {
                self.head = Slot::Open;
            } else if token.is_end("head") || token.is_start("body") {
                self.close_head(&mut out);
            } else if token.is_end("body") {
                self.close_body(&mut out);
            } else if token.is_end("html") {
                self.close_head(&mut out);
                self.close_body(&mut out);
            }

            if token.is_start("body") && self.body == Slot::Pending {
                self.body = Slot::Open;
            }

            self.observe_toc(&token.raw, token.is_start(TOC_ELEMENT), token.is_end(TOC_ELEMENT));
            out.extend_from_slice(&token.raw);
        }
        Bytes::from(out)
    }

    fn close_head(&mut self, out: &mut Vec<u8>) {
        if self.head == Slot::Open {
            out.extend_from_slice(self.injections.head.as_bytes());
            self.head = Slot::Injected;
        }
    }

    fn close_body(&mut self, out: &mut Vec<u8>) {
        if self.body == Slot::Open {
            out.extend_from_slice(self.injections.body.as_bytes());
            self.body = Slot::Injected;
        }
    }

    fn observe_toc(&mut self, raw: &[u8], opens: bool, closes: bool) {
        let Some(capture) = self.toc.as_mut() else {
            if opens {
                self.toc = Some(TocCapture {
                    depth: 1,
                    ..TocCapture::default()
                });
            }
            return;
        };

        if opens {
            capture.depth += 1;
        } else if closes {
            capture.depth -= 1;
        }

        if capture.depth == 0 {
            self.finish_toc();
        } else {
            capture.push(raw);
        }
    }

    fn finish_toc(&mut self) {
        let Some(capture) = self.toc.take() else {
            return;
        };
        if capture.truncated {
            tracing::warn!(limit = MAX_TOC_MARKUP, "TOC markup truncated");
        }
        let markup = String::from_utf8_lossy(&capture.markup);
        self.entries.extend(extract_toc(&markup));
    }
}
