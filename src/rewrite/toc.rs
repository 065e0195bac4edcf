//! Table-of-contents link extraction.

use std::sync::LazyLock;

use regex::Regex;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("anchor pattern compiles")
});

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("href pattern compiles")
});

static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<span\b[^>]*>(.*?)</span\s*>").expect("span pattern compiles"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

/// One navigation link found inside a `devsite-toc` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
}

/// Links in `markup` that carry a `<span>` label.
///
/// Labels have nested tags removed and whitespace collapsed; anchors without
/// an `href` or with an empty label are skipped.
pub fn extract_toc(markup: &str) -> Vec<TocEntry> {
    ANCHOR
        .captures_iter(markup)
        .filter_map(|anchor| {
            let href = HREF.captures(&anchor[1]).and_then(|c| {
                c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)).map(|m| m.as_str().to_string())
            })?;
            let span = SPAN.captures(&anchor[2])?;
            let label = collapse_whitespace(&TAG.replace_all(&span[1], ""));
            if label.is_empty() {
                return None;
            }
            Some(TocEntry { label, href })
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
