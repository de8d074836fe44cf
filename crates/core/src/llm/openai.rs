//! OpenAI chat-completions adapter using `json_schema` structured output.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ModelConfig, ModelError, OutputSchema, StructuredModel};
use crate::{JoblensError, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// OpenAI-backed [`StructuredModel`].
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: Client,
    config: ModelConfig,
}

impl OpenAiModel {
    /// Builds the adapter. An empty API key is rejected here, before any
    /// request is attempted.
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(JoblensError::Extraction {
                message: "model API key is not configured (set OPENAI_API_KEY)".to_string(),
                source: None,
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| JoblensError::Extraction {
                message: "failed to build model HTTP client".to_string(),
                source: Some(e.into()),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl StructuredModel for OpenAiModel {
    async fn produce_structured(
        &self, system: &str, user: &str, schema: &OutputSchema,
    ) -> std::result::Result<String, ModelError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: [Message { role: "system", content: system }, Message { role: "user", content: user }],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat { name: &schema.name, strict: true, schema: &schema.schema },
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "model request failed");
                if e.is_builder() {
                    ModelError::Request(e.to_string())
                } else {
                    ModelError::Connection(e.into())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "model provider error");
            return Err(ModelError::Api { status: status.as_u16(), body });
        }

        let body = response.bytes().await.map_err(|e| ModelError::Connection(e.into()))?;
        let reply: ChatResponse = serde_json::from_slice(&body).map_err(|e| ModelError::Malformed(e.to_string()))?;

        debug!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "structured completion received"
        );

        let message = reply.choices.into_iter().next().map(|c| c.message).ok_or(ModelError::EmptyResponse)?;
        if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(ModelError::Refusal(refusal));
        }

        match message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ModelError::EmptyResponse),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, JobRecord};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model(base_url: &str) -> OpenAiModel {
        OpenAiModel::new(ModelConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            timeout: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn completion(message: Value) -> Value {
        json!({"id": "chatcmpl-1", "object": "chat.completion", "choices": [{"index": 0, "message": message}]})
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let err = OpenAiModel::new(ModelConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
        assert!(err.to_string().contains("API key"));
    }

    #[tokio::test]
    async fn test_sends_strict_schema_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_schema", "json_schema": {"name": "JobRecord", "strict": true}},
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "usr"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "content": "{\"ok\":true}",
                "refusal": null
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let schema = OutputSchema::of::<JobRecord>();
        let content = model(&server.uri()).produce_structured("sys", "usr", &schema).await.unwrap();
        assert_eq!(content, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = model(&server.uri()).produce_structured("s", "u", &OutputSchema::of::<JobRecord>()).await;
        assert!(matches!(err, Err(ModelError::Api { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_refusal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "content": null,
                "refusal": "I can't help with that."
            }))))
            .mount(&server)
            .await;

        let err = model(&server.uri()).produce_structured("s", "u", &OutputSchema::of::<JobRecord>()).await;
        assert!(matches!(err, Err(ModelError::Refusal(_))));
    }

    #[tokio::test]
    async fn test_empty_choices_and_blank_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({"role": "assistant", "content": "  "}))))
            .mount(&server)
            .await;

        let model = model(&server.uri());
        let schema = OutputSchema::of::<JobRecord>();
        assert!(matches!(model.produce_structured("s", "u", &schema).await, Err(ModelError::EmptyResponse)));
        assert!(matches!(model.produce_structured("s", "u", &schema).await, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = model(&server.uri()).produce_structured("s", "u", &OutputSchema::of::<JobRecord>()).await;
        assert!(matches!(err, Err(ModelError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_connection_error() {
        let err = model("http://127.0.0.1:9").produce_structured("s", "u", &OutputSchema::of::<JobRecord>()).await;
        assert!(matches!(err, Err(ModelError::Connection(_))));
    }

    #[tokio::test]
    async fn test_dropped_connection_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let err = model(&format!("http://{addr}"))
            .produce_structured("s", "u", &OutputSchema::of::<JobRecord>())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Connection(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
