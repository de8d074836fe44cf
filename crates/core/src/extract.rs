//! Structured extraction of a [`JobRecord`] from normalized text.
//!
//! One model call per document, no retries and no repair loop. Provider
//! failures are mapped onto the pipeline's error kinds here; the pipeline
//! propagates them unchanged.

use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::llm::{ModelConfig, ModelError, OpenAiModel, OutputSchema, StructuredModel};
use crate::prompts::{SYSTEM_PROMPT, user_prompt};
use crate::{JobRecord, JoblensError, Result};

/// Turns normalized posting text into a validated, stamped [`JobRecord`].
pub struct StructuredExtractor {
    model: Arc<dyn StructuredModel>,
    schema: OutputSchema,
}

impl StructuredExtractor {
    pub fn new(model: Arc<dyn StructuredModel>) -> Self {
        Self { model, schema: OutputSchema::of::<JobRecord>() }
    }

    /// Extractor backed by the OpenAI adapter.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(OpenAiModel::new(config.clone())?)))
    }

    /// Extracts a record from `text`.
    ///
    /// `metadata.scraping_timestamp` and `metadata.source_url` are always
    /// overwritten with the current time and `source_url`.
    pub async fn extract(&self, text: &str, source_url: &str) -> Result<JobRecord> {
        if text.trim().is_empty() {
            return Err(JoblensError::Validation("no text to extract from".to_string()));
        }

        let start = Instant::now();
        let user = user_prompt(text);
        debug!(model = self.model.model_name(), chars = text.len(), "invoking model");

        let content = self
            .model
            .produce_structured(SYSTEM_PROMPT, &user, &self.schema)
            .await
            .map_err(classify)?;

        let mut record: JobRecord = serde_json::from_str(&content).map_err(|e| {
            warn!(error = %e, "model output does not match the record schema");
            JoblensError::invalid_response(format!("output does not match the record schema: {e}"), Some(e.into()))
        })?;
        record.validate()?;
        record.dedup_keywords();

        record.metadata.scraping_timestamp = now_rfc3339()?;
        record.metadata.source_url = source_url.to_string();

        info!(
            model = self.model.model_name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            confidence = record.metadata.confidence_score,
            "record extracted"
        );
        Ok(record)
    }
}

fn classify(err: ModelError) -> JoblensError {
    match err {
        ModelError::Connection(source) => {
            JoblensError::ExtractionConnection { message: "model provider unreachable".to_string(), source: Some(source) }
        }
        ModelError::Api { status, .. } if status == 429 || status >= 500 => {
            let message = err.to_string();
            JoblensError::ExtractionConnection { message, source: Some(err.into()) }
        }
        ModelError::Malformed(_) | ModelError::EmptyResponse | ModelError::Refusal(_) => {
            JoblensError::invalid_response(err.to_string(), Some(err.into()))
        }
        ModelError::Api { .. } | ModelError::Request(_) => {
            JoblensError::Extraction { message: err.to_string(), source: Some(err.into()) }
        }
    }
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| JoblensError::Extraction { message: "failed to format timestamp".to_string(), source: Some(e.into()) })
}
