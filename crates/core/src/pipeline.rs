//! The fetch → classify → normalize → extract orchestrator.
//!
//! [`Pipeline::run`] is the single entry point callers use. Each request moves
//! linearly through the [`Stage`]s; any stage can end the run with its own
//! [`JoblensError`], which is returned unchanged.
//!
//! A pipeline holds no per-request state and can be shared between
//! concurrent requests behind an `Arc`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::classify::is_markup;
use crate::config::{AcquireStrategy, PipelineConfig};
use crate::extract::StructuredExtractor;
use crate::fetch::{Acquirer, acquirer_for};
use crate::normalize::Normalizer;
use crate::{JobRecord, JoblensError, Result};

/// Stages of a single run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquiring,
    Classifying,
    Normalizing,
    Extracting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquiring => "acquiring",
            Stage::Classifying => "classifying",
            Stage::Normalizing => "normalizing",
            Stage::Extracting => "extracting",
        };
        f.write_str(name)
    }
}

/// Composed pipeline: acquirer, normalizer and extractor.
pub struct Pipeline {
    strategy: AcquireStrategy,
    acquirer: Arc<dyn Acquirer>,
    normalizer: Normalizer,
    extractor: StructuredExtractor,
}

impl Pipeline {
    /// Assembles a pipeline from explicit parts.
    pub fn new(
        strategy: AcquireStrategy, acquirer: Arc<dyn Acquirer>, normalizer: Normalizer, extractor: StructuredExtractor,
    ) -> Self {
        Self { strategy, acquirer, normalizer, extractor }
    }

    /// Builds the configured acquirer, converter chain and model adapter.
    ///
    /// Fails with [`JoblensError::Extraction`] when no API key is configured.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            config.strategy,
            acquirer_for(config)?,
            Normalizer::from_config(&config.normalize),
            StructuredExtractor::from_config(&config.model)?,
        ))
    }

    /// Acquisition strategy this pipeline was built with.
    pub fn strategy(&self) -> AcquireStrategy {
        self.strategy
    }

    /// Runs the whole pipeline for `url` and returns the extracted record.
    pub async fn run(&self, url: &str) -> Result<JobRecord> {
        let span = info_span!("pipeline", url = %url, strategy = %self.strategy);
        async {
            let start = Instant::now();
            let outcome = self.run_stages(url).await;

            match &outcome {
                Ok(_) => info!(elapsed_ms = start.elapsed().as_millis() as u64, "pipeline finished"),
                Err(e) => warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    kind = %e.kind(),
                    error = %e,
                    "pipeline failed"
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, url: &str) -> Result<JobRecord> {
        let text = prepare(self.acquirer.as_ref(), &self.normalizer, url).await?;

        let start = Instant::now();
        let record = self.extractor.extract(&text, url.trim()).await?;
        stage_done(Stage::Extracting, start);
        Ok(record)
    }
}

/// Runs every stage up to extraction: validates `url`, acquires the content
/// and normalizes it when it is markup.
///
/// Returns the text the extractor would receive.
pub async fn prepare(acquirer: &dyn Acquirer, normalizer: &Normalizer, url: &str) -> Result<String> {
    let parsed = validate_url(url)?;

    let start = Instant::now();
    let acquired = acquirer.acquire(&parsed).await?;
    stage_done(Stage::Acquiring, start);

    if acquired.raw_content.trim().is_empty() {
        return Err(JoblensError::Validation("no content retrieved".to_string()));
    }

    let start = Instant::now();
    let markup = is_markup(&acquired.raw_content, acquired.declared_media_type.as_deref());
    stage_done(Stage::Classifying, start);

    if !markup {
        debug!("content is plain text, skipping normalization");
        return Ok(acquired.raw_content);
    }

    let start = Instant::now();
    let text = normalizer.normalize(&acquired.raw_content)?;
    stage_done(Stage::Normalizing, start);
    Ok(text)
}

/// Accepts non-empty absolute `http`/`https` URLs with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(JoblensError::Validation("URL must not be empty".to_string()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| JoblensError::Validation(format!("invalid URL `{}`: {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(JoblensError::Validation(format!("unsupported URL scheme `{}`", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(JoblensError::Validation(format!("URL `{}` has no host", trimmed)));
    }

    Ok(parsed)
}

fn stage_done(stage: Stage, start: Instant) {
    debug!(stage = %stage, elapsed_ms = start.elapsed().as_millis() as u64, "stage complete");
}
