//! Markup normalization.
//!
//! [`Normalizer`] turns HTML into structure-preserving plain text by trying an
//! ordered chain of [`Converter`]s. A converter that fails with a
//! [`ConversionError`] (or yields only whitespace) hands over to the next one;
//! the chain only fails when every converter has.
//!
//! Default chain: `pandoc` (when enabled) → `htmd` (with the `markdown`
//! feature) → `tree`.

#[cfg(feature = "markdown")]
pub mod markdown;
pub mod pandoc;
pub mod tree;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{JoblensError, Result};

#[cfg(feature = "markdown")]
pub use markdown::HtmdConverter;
pub use pandoc::PandocConverter;
pub use tree::TreeConverter;

/// Converter chain settings.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Try the external `pandoc` binary first.
    pub use_pandoc: bool,
    /// Program name or path used to invoke pandoc.
    pub pandoc_path: PathBuf,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { use_pandoc: false, pandoc_path: PathBuf::from("pandoc") }
    }
}

/// Failure of a single converter. The only error that moves the chain on.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The converter's backing tool is missing.
    #[error("{0} is not available")]
    Unavailable(String),

    /// The converter ran and failed.
    #[error("conversion failed: {0}")]
    Failed(String),

    /// The converter produced only whitespace.
    #[error("converter produced no text")]
    Empty,
}

/// One HTML-to-text strategy.
pub trait Converter: Send + Sync {
    /// Short name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Converts `markup` to text.
    fn convert(&self, markup: &str) -> std::result::Result<String, ConversionError>;
}

/// Ordered converter chain.
pub struct Normalizer {
    converters: Vec<Box<dyn Converter>>,
}

impl Normalizer {
    /// Default chain without pandoc.
    pub fn new() -> Self {
        Self::from_config(&NormalizeConfig::default())
    }

    /// Chain described by `config`.
    pub fn from_config(config: &NormalizeConfig) -> Self {
        let mut converters: Vec<Box<dyn Converter>> = Vec::new();
        if config.use_pandoc {
            converters.push(Box::new(PandocConverter::new(&config.pandoc_path)));
        }
        #[cfg(feature = "markdown")]
        converters.push(Box::new(HtmdConverter));
        converters.push(Box::new(TreeConverter));

        Self { converters }
    }

    /// Chain with explicit converters, tried in order.
    pub fn with_converters(converters: Vec<Box<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// Names of the configured converters, in order.
    pub fn converter_names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Converts markup to text.
    ///
    /// Returns non-empty text or [`JoblensError::Normalization`]; the input is
    /// never passed through unchanged.
    pub fn normalize(&self, markup: &str) -> Result<String> {
        let mut failures = Vec::new();

        for converter in &self.converters {
            let outcome = converter.convert(markup).and_then(|text| {
                if text.trim().is_empty() { Err(ConversionError::Empty) } else { Ok(text) }
            });

            match outcome {
                Ok(text) => {
                    debug!(converter = converter.name(), bytes = text.len(), "markup normalized");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(converter = converter.name(), error = %e, "converter failed, trying next");
                    failures.push(format!("{}: {}", converter.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(JoblensError::Normalization("no converters configured".to_string()));
        }
        Err(JoblensError::Normalization(failures.join("; ")))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
