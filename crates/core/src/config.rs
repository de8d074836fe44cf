//! Pipeline configuration.
//!
//! [`PipelineConfig`] is built once at process start and handed to
//! [`Pipeline::from_config`](crate::Pipeline::from_config). Nothing in the
//! pipeline reads configuration from anywhere else.
//!
//! # Example
//!
//! ```rust
//! use joblens_core::{AcquireStrategy, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .strategy(AcquireStrategy::Browser)
//!     .timeout(20)
//!     .api_key("sk-test")
//!     .build();
//! assert_eq!(config.fetch.timeout, 20);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::fetch::FetchConfig;
use crate::llm::ModelConfig;
use crate::normalize::NormalizeConfig;

/// How page content is acquired.
///
/// The choice is static for the lifetime of a pipeline, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquireStrategy {
    /// Plain HTTP GET.
    #[default]
    Direct,
    /// Render the page in a headless browser and read the resulting DOM.
    Browser,
}

impl FromStr for AcquireStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" | "http" => Ok(Self::Direct),
            "browser" | "render" => Ok(Self::Browser),
            _ => Err(format!("Invalid strategy: {}. Valid options: direct, browser", s)),
        }
    }
}

impl fmt::Display for AcquireStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireStrategy::Direct => f.write_str("direct"),
            AcquireStrategy::Browser => f.write_str("browser"),
        }
    }
}

/// Immutable configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Acquisition strategy (default: direct fetch).
    pub strategy: AcquireStrategy,
    /// HTTP and browser settings.
    pub fetch: FetchConfig,
    /// Converter chain settings.
    pub normalize: NormalizeConfig,
    /// Language-model provider settings.
    pub model: ModelConfig,
}

impl PipelineConfig {
    /// Creates a new builder for PipelineConfig.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for PipelineConfig.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: PipelineConfig::default() }
    }

    /// Sets the acquisition strategy.
    pub fn strategy(mut self, value: AcquireStrategy) -> Self {
        self.config.strategy = value;
        self
    }

    /// Sets the fetch and page-load timeout in seconds.
    pub fn timeout(mut self, value: u64) -> Self {
        self.config.fetch.timeout = value;
        self
    }

    /// Sets the User-Agent sent by both strategies.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Sets whether TLS certificates are verified.
    pub fn verify_tls(mut self, value: bool) -> Self {
        self.config.fetch.verify_tls = value;
        self
    }

    /// Sets an explicit Chromium executable for the browser strategy.
    pub fn chrome_executable(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.fetch.chrome_executable = Some(value.into());
        self
    }

    /// Enables the pandoc converter ahead of the in-process ones.
    pub fn use_pandoc(mut self, value: bool) -> Self {
        self.config.normalize.use_pandoc = value;
        self
    }

    /// Sets the model provider API key.
    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        self.config.model.api_key = value.into();
        self
    }

    /// Sets the model name.
    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.config.model.model = value.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn temperature(mut self, value: f32) -> Self {
        self.config.model.temperature = value;
        self
    }

    /// Sets the provider base URL (proxies, compatible endpoints).
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.config.model.base_url = value.into();
        self
    }

    /// Builds the config.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
