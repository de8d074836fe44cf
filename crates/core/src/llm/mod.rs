//! Language-model capability.
//!
//! The extractor only sees [`StructuredModel`]: send a system/user instruction
//! pair with a JSON schema, get back a JSON document. [`OpenAiModel`] is the
//! concrete adapter; tests substitute stubs.

pub mod openai;

use std::fmt;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde_json::Value;
use thiserror::Error;

use crate::error::BoxError;

pub use openai::OpenAiModel;

/// Model provider settings.
#[derive(Clone)]
pub struct ModelConfig {
    /// Provider API key. Must be non-empty when a model is built.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Provider base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: 60,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Failure of a single model call, before it is mapped onto the pipeline's
/// error kinds.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The provider could not be reached (DNS, refused, reset, timed out).
    #[error("connection to model provider failed: {0}")]
    Connection(#[source] BoxError),

    /// The provider answered with a non-success status.
    #[error("model provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider's reply could not be read as a completion.
    #[error("malformed provider reply: {0}")]
    Malformed(String),

    /// The completion carried no content.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model declined to answer.
    #[error("model refused the request: {0}")]
    Refusal(String),

    /// The request could not be built.
    #[error("model request failed: {0}")]
    Request(String),
}

/// A named JSON schema in the strict form structured-output providers accept.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Derives the strict schema for `T`.
    ///
    /// References are inlined, every object is closed with
    /// `additionalProperties: false` and lists all of its properties as
    /// required (optional fields stay nullable), and keywords strict mode
    /// rejects are removed.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(root).unwrap_or_default();

        inline_refs(&mut schema);
        flatten_single_all_of(&mut schema);
        close_objects(&mut schema);
        strip_keywords(&mut schema);

        if let Value::Object(map) = &mut schema {
            map.remove("definitions");
            map.remove("$schema");
        }

        Self { name: T::schema_name(), schema }
    }
}

/// Capability to produce a schema-constrained JSON document.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Makes exactly one request and returns the raw JSON text.
    async fn produce_structured(&self, system: &str, user: &str, schema: &OutputSchema) -> Result<String, ModelError>;

    /// Model name for logs.
    fn model_name(&self) -> &str;
}

const UNSUPPORTED_KEYWORDS: [&str; 3] = ["default", "format", "title"];

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(definitions) = definitions {
        inline_refs_with(value, &definitions);
    }
}

fn inline_refs_with(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(mut inlined) = target {
                inline_refs_with(&mut inlined, definitions);
                map.remove("$ref");
                if let Value::Object(fields) = inlined {
                    for (key, field) in fields {
                        map.entry(key).or_insert(field);
                    }
                }
                return;
            }

            map.values_mut().for_each(|v| inline_refs_with(v, definitions));
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs_with(v, definitions)),
        _ => {}
    }
}

// `{"description": .., "allOf": [schema]}` → `schema` plus the description.
fn flatten_single_all_of(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let single = match map.get("allOf") {
                Some(Value::Array(items)) if items.len() == 1 => items.first().cloned(),
                _ => None,
            };
            if let Some(Value::Object(fields)) = single {
                map.remove("allOf");
                for (key, field) in fields {
                    map.entry(key).or_insert(field);
                }
            }
            map.values_mut().for_each(flatten_single_all_of);
        }
        Value::Array(items) => items.iter_mut().for_each(flatten_single_all_of),
        _ => {}
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(properties)) = map.get("properties") {
                    let required = properties.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            map.values_mut().for_each(close_objects);
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn strip_keywords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for keyword in UNSUPPORTED_KEYWORDS {
                map.remove(keyword);
            }
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    // Property names are data, not keywords.
                    ("properties", Value::Object(properties)) => properties.values_mut().for_each(strip_keywords),
                    (_, child) => strip_keywords(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_keywords),
        _ => {}
    }
}
