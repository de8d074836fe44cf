//! HTTP routing for the extraction pipeline.
//!
//! The core only reports [`ErrorKind`]s; turning them into status codes and a
//! user-visible error body happens here.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use joblens_core::{ErrorKind, JobRecord, JoblensError, Pipeline};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Shared handler state. The pipeline is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    strategy: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    detail: String,
}

/// A failed request: the kind decides the status, the detail is shown to the caller.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    detail: String,
}

impl From<JoblensError> for ApiError {
    fn from(err: JoblensError) -> Self {
        Self { kind: err.kind(), detail: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        (status, Json(ErrorBody { kind: self.kind, detail: self.detail })).into_response()
    }
}

/// Transport status for each failure kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NetworkFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::NormalizationFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::AcquisitionFailure => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ExtractionConnectionFailure => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ExtractionResponseInvalid => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ExtractionFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/scrape/", post(scrape))
        .route("/scrape", post(scrape))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();

    Json(HealthResponse {
        status: "healthy",
        timestamp,
        version: env!("CARGO_PKG_VERSION"),
        strategy: state.pipeline.strategy().to_string(),
    })
}

async fn scrape(
    State(state): State<AppState>, payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError {
        kind: ErrorKind::ValidationFailure,
        detail: format!("Validation failed: {}", rejection.body_text()),
    })?;

    let request_id = Uuid::new_v4();
    let span = info_span!("scrape", %request_id);

    async move {
        let start = Instant::now();
        info!(url = %request.url, "processing request");

        match state.pipeline.run(&request.url).await {
            Ok(record) => {
                info!(elapsed_ms = start.elapsed().as_millis() as u64, "request completed");
                Ok(Json(record))
            }
            Err(e) => {
                let status = status_for(e.kind());
                if status.is_server_error() {
                    error!(kind = %e.kind(), status = status.as_u16(), error = %e, "request failed");
                } else {
                    warn!(kind = %e.kind(), status = status.as_u16(), error = %e, "request rejected");
                }
                Err(ApiError::from(e))
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use joblens_core::{
        AcquireStrategy, Acquirer, AcquisitionResult, ModelError, Normalizer, OutputSchema, StructuredExtractor,
        StructuredModel,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use url::Url;

    struct StaticAcquirer(fn() -> joblens_core::Result<AcquisitionResult>);

    #[async_trait]
    impl Acquirer for StaticAcquirer {
        async fn acquire(&self, _url: &Url) -> joblens_core::Result<AcquisitionResult> {
            (self.0)()
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    struct StaticModel(fn() -> Result<String, ModelError>);

    #[async_trait]
    impl StructuredModel for StaticModel {
        async fn produce_structured(
            &self, _system: &str, _user: &str, _schema: &OutputSchema,
        ) -> Result<String, ModelError> {
            (self.0)()
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    fn posting() -> joblens_core::Result<AcquisitionResult> {
        let html = std::fs::read_to_string("../../tests/fixtures/job_posting.html").unwrap();
        Ok(AcquisitionResult::new(html, Some("text/html".to_string())))
    }

    fn record() -> Result<String, ModelError> {
        Ok(std::fs::read_to_string("../../tests/fixtures/model_response.json").unwrap())
    }

    fn app(
        acquire: fn() -> joblens_core::Result<AcquisitionResult>, model: fn() -> Result<String, ModelError>,
    ) -> Router {
        let pipeline = Pipeline::new(
            AcquireStrategy::Direct,
            Arc::new(StaticAcquirer(acquire)),
            Normalizer::new(),
            StructuredExtractor::new(Arc::new(StaticModel(model))),
        );
        router(AppState::new(Arc::new(pipeline)))
    }

    fn scrape_request(body: &str) -> Request<Body> {
        Request::post("/scrape/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::ValidationFailure), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::NetworkFailure), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::NormalizationFailure), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::AcquisitionFailure), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::ExtractionConnectionFailure), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::ExtractionResponseInvalid), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::ExtractionFailure), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(posting, record), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["strategy"], "direct");
        assert!(OffsetDateTime::parse(body["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_scrape_success() {
        let url = "https://jobs.example.com/postings/42";
        let (status, body) = send(app(posting, record), scrape_request(&format!(r#"{{"url": "{url}"}}"#))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["company"], "Acme Robotics");
        assert_eq!(body["employment"]["type"], "full-time");
        assert_eq!(body["metadata"]["source_url"], url);
    }

    #[tokio::test]
    async fn test_scrape_invalid_url() {
        let (status, body) = send(app(posting, record), scrape_request(r#"{"url": "not a url"}"#)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation_failure");
        assert!(body["detail"].as_str().unwrap().contains("Validation failed"));
    }

    #[tokio::test]
    async fn test_scrape_malformed_body() {
        let (status, body) = send(app(posting, record), scrape_request(r#"{"link": 1}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation_failure");
    }

    #[tokio::test]
    async fn test_scrape_timeout() {
        fn timed_out() -> joblens_core::Result<AcquisitionResult> {
            Err(JoblensError::Timeout { operation: "HTTP request".to_string(), timeout: 30 })
        }

        let (status, body) = send(app(timed_out, record), scrape_request(r#"{"url": "https://example.com"}"#)).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["kind"], "timeout");
    }

    #[tokio::test]
    async fn test_scrape_provider_unavailable() {
        fn unavailable() -> Result<String, ModelError> {
            Err(ModelError::Api { status: 502, body: "bad gateway".to_string() })
        }

        let (status, body) = send(app(posting, unavailable), scrape_request(r#"{"url": "https://example.com"}"#)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "extraction_connection_failure");
    }

    #[tokio::test]
    async fn test_scrape_invalid_model_output() {
        fn garbage() -> Result<String, ModelError> {
            Ok(r#"{"company": "Acme"}"#.to_string())
        }

        let (status, body) = send(app(posting, garbage), scrape_request(r#"{"url": "https://example.com"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "extraction_response_invalid");
    }
}
