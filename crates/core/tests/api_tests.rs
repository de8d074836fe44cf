//! Pipeline integration tests with stubbed acquisition and model
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use joblens_core::*;
use url::Url;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

enum Reply {
    Content(String, Option<&'static str>),
    Fail(fn() -> JoblensError),
}

struct StubAcquirer {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubAcquirer {
    fn serving(content: impl Into<String>, media_type: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self { reply: Reply::Content(content.into(), media_type), calls: AtomicUsize::new(0) })
    }

    fn failing(err: fn() -> JoblensError) -> Arc<Self> {
        Arc::new(Self { reply: Reply::Fail(err), calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Acquirer for StubAcquirer {
    async fn acquire(&self, _url: &Url) -> Result<AcquisitionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Content(content, media_type) => {
                Ok(AcquisitionResult::new(content.clone(), media_type.map(str::to_string)))
            }
            Reply::Fail(err) => Err(err()),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct StubModel {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    fn answering(response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { response: response.into(), prompts: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl StructuredModel for StubModel {
    async fn produce_structured(
        &self, _system: &str, user: &str, _schema: &OutputSchema,
    ) -> std::result::Result<String, ModelError> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn pipeline(acquirer: Arc<dyn Acquirer>, model: Arc<StubModel>) -> Pipeline {
    Pipeline::new(AcquireStrategy::Direct, acquirer, Normalizer::new(), StructuredExtractor::new(model))
}

const URL: &str = "https://jobs.example.com/postings/senior-rust-engineer";

#[tokio::test]
async fn test_invalid_urls_fail_before_any_io() {
    let acquirer = StubAcquirer::serving(fixture("job_posting.html"), Some("text/html"));
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = pipeline(acquirer.clone(), model.clone());

    for url in ["", "not a url"] {
        let err = pipeline.run(url).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure, "{url:?}");
    }

    assert_eq!(acquirer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_html_posting_end_to_end() {
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = pipeline(StubAcquirer::serving(fixture("job_posting.html"), Some("text/html")), model.clone());

    let record = pipeline.run(URL).await.unwrap();
    assert_eq!(record.company, "Acme Robotics");
    assert_eq!(record.title, "Senior Rust Engineer");
    assert_eq!(record.location.remote_status, Some(RemoteStatus::Hybrid));
    assert_eq!(record.important_info.salary_range.currency, "USD");

    let prompt = model.last_prompt();
    assert!(prompt.contains("Senior Rust Engineer"));
    assert!(prompt.contains("Kubernetes"));
    assert!(!prompt.contains("<h1>"));
    assert!(!prompt.contains("trackPageView"));
    assert!(!prompt.contains("dataLayer"));
}

#[tokio::test]
async fn test_metadata_overrides_model_output() {
    let pipeline = pipeline(
        StubAcquirer::serving(fixture("job_posting.html"), Some("text/html")),
        StubModel::answering(fixture("model_response.json")),
    );

    let record = pipeline.run(URL).await.unwrap();
    assert_eq!(record.metadata.source_url, URL);
    assert_ne!(record.metadata.source_url, "http://wrong");
    assert_ne!(record.metadata.scraping_timestamp, "2020-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_source_url_is_stamped_trimmed() {
    let pipeline = pipeline(
        StubAcquirer::serving(fixture("job_posting.html"), Some("text/html")),
        StubModel::answering(fixture("model_response.json")),
    );

    let record = pipeline.run(&format!("  {URL}\n")).await.unwrap();
    assert_eq!(record.metadata.source_url, URL);
}

#[tokio::test]
async fn test_plain_text_skips_normalization() {
    let plain = fixture("plain_posting.txt");
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = pipeline(StubAcquirer::serving(plain.clone(), Some("text/plain")), model.clone());

    pipeline.run(URL).await.unwrap();
    assert!(model.last_prompt().ends_with(&plain));
}

#[tokio::test]
async fn test_sniffed_markup_is_normalized() {
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = pipeline(StubAcquirer::serving(fixture("job_posting.html"), Some("text/plain")), model.clone());

    pipeline.run(URL).await.unwrap();
    assert!(!model.last_prompt().contains("<body>"));
}

#[tokio::test]
async fn test_blank_page_is_validation_failure() {
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = pipeline(StubAcquirer::serving("  \n ", Some("text/html")), model.clone());

    let err = pipeline.run(URL).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert!(err.to_string().contains("no content retrieved"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_acquisition_errors_pass_through() {
    let cases: [(fn() -> JoblensError, ErrorKind); 3] = [
        (|| JoblensError::Timeout { operation: "HTTP request".to_string(), timeout: 30 }, ErrorKind::Timeout),
        (|| JoblensError::Network { message: "404 Not Found".to_string(), source: None }, ErrorKind::NetworkFailure),
        (
            || JoblensError::Acquisition { message: "browser crashed".to_string(), source: None },
            ErrorKind::AcquisitionFailure,
        ),
    ];

    for (err, expected) in cases {
        let model = StubModel::answering(fixture("model_response.json"));
        let pipeline = pipeline(StubAcquirer::failing(err), model.clone());
        assert_eq!(pipeline.run(URL).await.unwrap_err().kind(), expected);
        assert_eq!(model.calls(), 0);
    }
}

#[tokio::test]
async fn test_missing_title_is_invalid_response() {
    let mut response: serde_json::Value = serde_json::from_str(&fixture("model_response.json")).unwrap();
    response.as_object_mut().unwrap().remove("title");

    let pipeline = pipeline(
        StubAcquirer::serving(fixture("job_posting.html"), Some("text/html")),
        StubModel::answering(response.to_string()),
    );

    let err = pipeline.run(URL).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtractionResponseInvalid);
}

#[tokio::test]
async fn test_normalization_failure_stops_the_run() {
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline = Pipeline::new(
        AcquireStrategy::Direct,
        StubAcquirer::serving("<html><body><script>x()</script></body></html>", Some("text/html")),
        Normalizer::new(),
        StructuredExtractor::new(model.clone()),
    );

    let err = pipeline.run(URL).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NormalizationFailure);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_share_a_pipeline() {
    let pipeline = Arc::new(pipeline(
        StubAcquirer::serving(fixture("job_posting.html"), Some("text/html")),
        StubModel::answering(fixture("model_response.json")),
    ));

    let a = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run("https://jobs.example.com/a").await }
    });
    let b = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run("https://jobs.example.com/b").await }
    });

    assert_eq!(a.await.unwrap().unwrap().metadata.source_url, "https://jobs.example.com/a");
    assert_eq!(b.await.unwrap().unwrap().metadata.source_url, "https://jobs.example.com/b");
}

#[test]
fn test_pipeline_requires_api_key() {
    let err = Pipeline::from_config(&PipelineConfig::default()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
}

#[cfg(feature = "browser")]
#[test]
fn test_pipeline_from_config() {
    let config = PipelineConfig::builder().api_key("sk-test").strategy(AcquireStrategy::Browser).build();
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.strategy(), AcquireStrategy::Browser);
}

#[tokio::test]
async fn test_prepare_returns_normalized_text() {
    let acquirer = StubAcquirer::serving(fixture("job_posting.html"), Some("text/html"));
    let text = prepare(acquirer.as_ref(), &Normalizer::new(), URL).await.unwrap();

    assert!(text.contains("Senior Rust Engineer"));
    assert!(text.contains("Tokio"));
    assert!(!text.contains("<p>"));
}

struct HangingLauncher {
    open: Arc<AtomicUsize>,
}

struct HangingSession {
    open: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserLauncher for HangingLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HangingSession { open: self.open.clone() }))
    }
}

#[async_trait]
impl BrowserSession for HangingSession {
    async fn navigate(&mut self, _url: &Url) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(String::new())
    }

    async fn media_type(&mut self) -> Option<String> {
        None
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_browser_timeout_releases_browser() {
    let open = Arc::new(AtomicUsize::new(0));
    let acquirer = BrowserAcquirer::new(HangingLauncher { open: open.clone() }, 30);
    let model = StubModel::answering(fixture("model_response.json"));
    let pipeline =
        Pipeline::new(AcquireStrategy::Browser, Arc::new(acquirer), Normalizer::new(), StructuredExtractor::new(model));

    let err = pipeline.run(URL).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(open.load(Ordering::SeqCst), 0);
}
