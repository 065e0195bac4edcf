//! Upstream URL construction.

use url::{form_urlencoded, Url};

use crate::routing::path::PathDescriptor;

/// Query parameter carrying the host language.
pub const LANG_PARAM: &str = "hl";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamUrlError {
    #[error("invalid upstream url '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Absolute URL of one upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub url: Url,
}

impl UpstreamTarget {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Composes upstream URLs from a fixed base.
#[derive(Debug, Clone)]
pub struct UpstreamUrlBuilder {
    base: Url,
}

impl UpstreamUrlBuilder {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build `base[/remainder]?query` with `hl` forced to the lowercased
    /// language code.
    pub fn build(
        &self,
        descriptor: &PathDescriptor,
        query: Option<&str>,
    ) -> Result<UpstreamTarget, UpstreamUrlError> {
        let joined = descriptor.joined_remainder();
        let mut raw = self.base.as_str().trim_end_matches('/').to_string();
        if !joined.is_empty() {
            raw.push('/');
            raw.push_str(&joined);
        }

        let mut url = Url::parse(&raw).map_err(|source| UpstreamUrlError::Parse { url: raw, source })?;
        url.query_pairs_mut()
            .clear()
            .extend_pairs(with_lang(query, &descriptor.lang_code));

        Ok(UpstreamTarget { url })
    }
}

/// Inbound query pairs in order, with the first `hl` replaced in place (or
/// appended) and any further `hl` dropped.
fn with_lang(query: Option<&str>, lang_code: &str) -> Vec<(String, String)> {
    let lang = lang_code.to_lowercase();
    let mut pairs = Vec::new();
    let mut placed = false;

    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key == LANG_PARAM {
            if !placed {
                pairs.push((LANG_PARAM.to_string(), lang.clone()));
                placed = true;
            }
            continue;
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }

    if !placed {
        pairs.push((LANG_PARAM.to_string(), lang));
    }
    pairs
}
