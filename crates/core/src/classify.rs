//! Content-type classification.
//!
//! Decides whether acquired content is markup that needs normalizing or text
//! that can go to the extractor as-is. A declared `text/html` media type is
//! trusted when present; otherwise the body is sniffed for structural markers,
//! since servers routinely mislabel pages.

use std::sync::LazyLock;

use regex::RegexSet;

static MARKUP_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)<!DOCTYPE\s+html",
        r"(?i)<html",
        r"(?i)<head",
        r"(?i)<body",
        r"(?i)<div",
        r"(?i)<p>",
        r"(?i)<a\s+href=",
    ])
    .unwrap()
});

/// Returns true when `content` should be treated as HTML.
///
/// # Example
///
/// ```rust
/// use joblens_core::is_markup;
///
/// assert!(is_markup("plain words", Some("text/html")));
/// assert!(is_markup("<body><p>Hi</p></body>", None));
/// assert!(!is_markup("Senior Rust Engineer, Remote", Some("text/plain")));
/// ```
pub fn is_markup(content: &str, declared_media_type: Option<&str>) -> bool {
    if let Some(media_type) = declared_media_type
        && media_type.to_ascii_lowercase().contains("text/html")
    {
        return true;
    }

    MARKUP_PATTERNS.is_match(content)
}
