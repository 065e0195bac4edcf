//! Inbound path translation.
//!
//! # Responsibilities
//! - Split `/{lang}/docs/{rest...}` into its parts
//! - Reject paths without the `docs` marker at segment 2
//! - Reject `.` and `..` segments, plain or percent-encoded
//! - Optionally enforce the strict segment shape
//!
//! # Design Decisions
//! - Language codes are accepted verbatim; lowercasing happens when the
//!   upstream query is built
//! - Segments are not percent-decoded
//! - Strictness is a startup choice, never a per-request one

use std::sync::LazyLock;

use regex::Regex;

use crate::config::PathValidation;

/// Literal expected at segment index 2.
pub const DOCS_MARKER: &str = "docs";

/// Language segment plus at most two more segments after `/docs`.
static STRICT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[A-Za-z0-9-]+/docs(?:/[A-Za-z0-9-]+){0,2}/?$").expect("strict path pattern compiles")
});

/// Why an inbound path was refused. Both map to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Fewer than three segments, no `docs` marker, or a dot segment.
    #[error("Invalid path")]
    InvalidPath,
    /// Rejected by strict validation.
    #[error("Forbidden")]
    Forbidden,
}

/// A validated inbound docs path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDescriptor {
    /// Segment 1, verbatim (e.g. `zh-CN`).
    pub lang_code: String,
    /// Segment 2, always [`DOCS_MARKER`].
    pub docs_marker: String,
    /// Segments from index 3 on; may be empty.
    pub remainder: Vec<String>,
}

impl PathDescriptor {
    /// Remainder segments joined with `/`.
    pub fn joined_remainder(&self) -> String {
        self.remainder.join("/")
    }
}

/// Turns inbound request paths into [`PathDescriptor`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTranslator {
    validation: PathValidation,
}

impl PathTranslator {
    pub fn new(validation: PathValidation) -> Self {
        Self { validation }
    }

    pub fn validation(&self) -> PathValidation {
        self.validation
    }

    /// Parse and validate an inbound path.
    pub fn translate(&self, path: &str) -> Result<PathDescriptor, PathError> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 3 || segments[2] != DOCS_MARKER {
            return Err(PathError::InvalidPath);
        }
        // URL resolution would climb out of the upstream base path.
        if segments.iter().any(|s| is_dot_segment(s)) {
            return Err(PathError::InvalidPath);
        }

        if self.validation == PathValidation::Strict && !STRICT_PATH.is_match(path) {
            return Err(PathError::Forbidden);
        }

        Ok(PathDescriptor {
            lang_code: segments[1].to_string(),
            docs_marker: segments[2].to_string(),
            remainder: segments[3..].iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// `.` or `..`, with any dot written as `%2e` / `%2E`.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loose() -> PathTranslator {
        PathTranslator::new(PathValidation::Loose)
    }

    fn strict() -> PathTranslator {
        PathTranslator::new(PathValidation::Strict)
    }

    #[test]
    fn test_translate_with_remainder() {
        let desc = loose().translate("/zh-CN/docs/quickstart").unwrap();
        assert_eq!(desc.lang_code, "zh-CN");
        assert_eq!(desc.docs_marker, "docs");
        assert_eq!(desc.remainder, vec!["quickstart"]);
        assert_eq!(desc.joined_remainder(), "quickstart");
    }

    #[test]
    fn test_translate_without_remainder() {
        let desc = loose().translate("/ja-JP/docs").unwrap();
        assert_eq!(desc.lang_code, "ja-JP");
        assert!(desc.remainder.is_empty());
        assert_eq!(desc.joined_remainder(), "");
    }

    #[test]
    fn test_trailing_slash_yields_empty_remainder() {
        let desc = loose().translate("/ja-JP/docs/").unwrap();
        assert_eq!(desc.joined_remainder(), "");
    }

    #[test]
    fn test_rejects_short_or_unmarked_paths() {
        for path in ["/", "/zh-CN", "/docs/zh-CN", "/zh-CN/api/models", "/zh-CN/Docs/x"] {
            assert_eq!(loose().translate(path), Err(PathError::InvalidPath), "{path}");
        }
    }

    #[test]
    fn test_loose_accepts_deep_and_odd_segments() {
        let desc = loose().translate("/xx_YY/docs/a/b/c/d.html").unwrap();
        assert_eq!(desc.lang_code, "xx_YY");
        assert_eq!(desc.joined_remainder(), "a/b/c/d.html");
    }

    #[test]
    fn test_segments_are_not_decoded() {
        let desc = loose().translate("/en/docs/a%20b").unwrap();
        assert_eq!(desc.remainder, vec!["a%20b"]);
    }

    #[test]
    fn test_rejects_dot_segments() {
        for path in [
            "/en/docs/../../../secret",
            "/en/docs/./quickstart",
            "/en/docs/a/..",
            "/en/docs/%2e%2e/%2e%2e/admin",
            "/en/docs/%2E%2e/admin",
            "/en/docs/.%2e/admin",
            "/en/docs/%2e",
            "/../docs/x",
        ] {
            assert_eq!(loose().translate(path), Err(PathError::InvalidPath), "{path}");
            assert_eq!(strict().translate(path), Err(PathError::InvalidPath), "{path}");
        }
    }

    #[test]
    fn test_dots_inside_segments_are_kept() {
        let desc = loose().translate("/en/docs/.well-known/v1..2/a.html").unwrap();
        assert_eq!(desc.joined_remainder(), ".well-known/v1..2/a.html");
    }

    #[test]
    fn test_validation_mode_is_reported() {
        assert_eq!(loose().validation(), PathValidation::Loose);
        assert_eq!(strict().validation(), PathValidation::Strict);
    }

    #[test]
    fn test_strict_accepts_up_to_two_segments() {
        assert!(strict().translate("/zh-CN/docs").is_ok());
        assert!(strict().translate("/zh-CN/docs/").is_ok());
        assert!(strict().translate("/zh-CN/docs/models").is_ok());
        assert!(strict().translate("/zh-CN/docs/models/gemini-2").is_ok());
    }

    #[test]
    fn test_strict_rejects_depth_and_charset() {
        assert_eq!(strict().translate("/zh-CN/docs/a/b/c"), Err(PathError::Forbidden));
        assert_eq!(strict().translate("/zh-CN/docs/a.html"), Err(PathError::Forbidden));
        assert_eq!(strict().translate("/zh_CN/docs/a"), Err(PathError::Forbidden));
        assert_eq!(strict().translate("//docs/a"), Err(PathError::Forbidden));
    }

    #[test]
    fn test_strict_still_reports_missing_marker_as_invalid() {
        assert_eq!(strict().translate("/zh-CN/api"), Err(PathError::InvalidPath));
    }
}
