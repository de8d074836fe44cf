//! In-process HTML to Markdown conversion with htmd.

use htmd::HtmlToMarkdown;

use super::{ConversionError, Converter};

const SKIPPED_TAGS: [&str; 6] = ["script", "style", "svg", "iframe", "noscript", "head"];

/// Converts HTML to Markdown using the htmd crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmdConverter;

impl Converter for HtmdConverter {
    fn name(&self) -> &'static str {
        "htmd"
    }

    fn convert(&self, markup: &str) -> Result<String, ConversionError> {
        let converter = HtmlToMarkdown::builder().skip_tags(SKIPPED_TAGS.to_vec()).build();
        converter
            .convert(markup)
            .map(|markdown| markdown.trim().to_string())
            .map_err(|e| ConversionError::Failed(e.to_string()))
    }
}
