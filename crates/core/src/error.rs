//! Error types for Joblens operations.
//!
//! This module defines the main error type [`JoblensError`], one variant per
//! failure kind the pipeline can surface, and the flat [`ErrorKind`] tag that
//! callers switch on. Every stage classifies the failures it understands and
//! wraps anything else into its generic variant, keeping the original cause as
//! the error source.
//!
//! # Example
//!
//! ```rust
//! use joblens_core::{ErrorKind, JoblensError, Result};
//!
//! fn check(url: &str) -> Result<()> {
//!     if url.is_empty() {
//!         return Err(JoblensError::Validation("URL must not be empty".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(check("").unwrap_err().kind(), ErrorKind::ValidationFailure);
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Boxed cause kept behind a failure for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the fetch, normalize and extract pipeline.
#[derive(Error, Debug)]
pub enum JoblensError {
    /// Malformed or empty input, before or after acquisition.
    ///
    /// Returned for an empty or unparseable URL, for a page that was fetched
    /// but turned out blank, and for blank text handed to the extractor.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A network or page-load deadline was exceeded.
    #[error("{operation} timed out after {timeout} seconds")]
    Timeout { operation: String, timeout: u64 },

    /// Transport or HTTP-level failure (DNS, TLS, refused connection, non-2xx).
    #[error("Network failure: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Every converter in the normalizer chain failed.
    #[error("Failed to normalize markup: {0}")]
    Normalization(String),

    /// Unrecoverable acquisition error that is neither a timeout nor a
    /// transport failure (browser launch, automation errors).
    #[error("Acquisition failed: {message}")]
    Acquisition {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The model provider could not be reached.
    #[error("Model provider unavailable: {message}")]
    ExtractionConnection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The model returned empty or non-conformant output.
    #[error("Invalid model response: {message}")]
    ExtractionResponseInvalid {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Unrecoverable extraction error (request construction, provider rejection).
    #[error("Extraction failed: {message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl JoblensError {
    /// Returns the caller-facing failure kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JoblensError::Validation(_) => ErrorKind::ValidationFailure,
            JoblensError::Timeout { .. } => ErrorKind::Timeout,
            JoblensError::Network { .. } => ErrorKind::NetworkFailure,
            JoblensError::Normalization(_) => ErrorKind::NormalizationFailure,
            JoblensError::Acquisition { .. } => ErrorKind::AcquisitionFailure,
            JoblensError::ExtractionConnection { .. } => ErrorKind::ExtractionConnectionFailure,
            JoblensError::ExtractionResponseInvalid { .. } => ErrorKind::ExtractionResponseInvalid,
            JoblensError::Extraction { .. } => ErrorKind::ExtractionFailure,
        }
    }

    pub(crate) fn network(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        JoblensError::Network { message: message.into(), source: Some(source.into()) }
    }

    pub(crate) fn acquisition(message: impl Into<String>, source: Option<BoxError>) -> Self {
        JoblensError::Acquisition { message: message.into(), source }
    }

    pub(crate) fn invalid_response(message: impl Into<String>, source: Option<BoxError>) -> Self {
        JoblensError::ExtractionResponseInvalid { message: message.into(), source }
    }
}

/// Flat failure taxonomy exposed to callers.
///
/// The routing layer maps each kind to a transport status; the core never
/// deals in status codes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailure,
    Timeout,
    NetworkFailure,
    NormalizationFailure,
    AcquisitionFailure,
    ExtractionConnectionFailure,
    ExtractionResponseInvalid,
    ExtractionFailure,
}

impl ErrorKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::NormalizationFailure => "normalization_failure",
            ErrorKind::AcquisitionFailure => "acquisition_failure",
            ErrorKind::ExtractionConnectionFailure => "extraction_connection_failure",
            ErrorKind::ExtractionResponseInvalid => "extraction_response_invalid",
            ErrorKind::ExtractionFailure => "extraction_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for JoblensError.
pub type Result<T> = std::result::Result<T, JoblensError>;
