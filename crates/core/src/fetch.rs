//! Content acquisition.
//!
//! An [`Acquirer`] turns a URL into raw page content plus the media type the
//! server (or rendered document) declared for it. Two strategies exist: a
//! plain HTTP GET ([`HttpAcquirer`]) and a headless-browser render
//! ([`BrowserAcquirer`](crate::browser::BrowserAcquirer)). Which one a
//! pipeline uses is fixed by [`PipelineConfig::strategy`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue, USER_AGENT};
use tracing::{debug, info};
use url::Url;

use crate::config::{AcquireStrategy, PipelineConfig};
use crate::{JoblensError, Result};

pub(crate) const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP and browser settings shared by both acquisition strategies.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request and page-load timeout in seconds.
    pub timeout: u64,
    /// User-Agent string.
    pub user_agent: String,
    /// Verify TLS certificates. Disable only for hosts with broken chains.
    pub verify_tls: bool,
    /// Chromium binary for the browser strategy; auto-detected when unset.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Joblens/1.0)".to_string(),
            verify_tls: true,
            chrome_executable: None,
        }
    }
}

/// Raw content acquired for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionResult {
    /// Response body or rendered document.
    pub raw_content: String,
    /// Declared media type without parameters, lower-cased.
    pub declared_media_type: Option<String>,
}

impl AcquisitionResult {
    pub fn new(raw_content: impl Into<String>, declared_media_type: Option<String>) -> Self {
        Self { raw_content: raw_content.into(), declared_media_type }
    }
}

/// A strategy for fetching page content.
///
/// Implementations make exactly one attempt per call and never retry.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Fetches the content behind `url`.
    async fn acquire(&self, url: &Url) -> Result<AcquisitionResult>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Builds the acquirer selected by `config.strategy`.
pub fn acquirer_for(config: &PipelineConfig) -> Result<Arc<dyn Acquirer>> {
    match config.strategy {
        AcquireStrategy::Direct => Ok(Arc::new(HttpAcquirer::new(config.fetch.clone()))),
        #[cfg(feature = "browser")]
        AcquireStrategy::Browser => {
            let launcher = crate::browser::ChromiumLauncher::new(config.fetch.clone());
            Ok(Arc::new(crate::browser::BrowserAcquirer::new(launcher, config.fetch.timeout)))
        }
        #[cfg(not(feature = "browser"))]
        AcquireStrategy::Browser => Err(JoblensError::acquisition(
            "browser strategy requires the `browser` feature",
            None,
        )),
    }
}

/// Direct-fetch strategy: one GET, redirects followed, bounded total timeout.
#[derive(Debug, Clone)]
pub struct HttpAcquirer {
    config: FetchConfig,
}

impl HttpAcquirer {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .map_err(|e| JoblensError::acquisition("failed to build HTTP client", Some(e.into())))
    }

    fn classify(&self, err: reqwest::Error) -> JoblensError {
        if err.is_timeout() {
            JoblensError::Timeout { operation: "HTTP request".to_string(), timeout: self.config.timeout }
        } else {
            JoblensError::network(err.to_string(), err)
        }
    }
}

#[async_trait]
impl Acquirer for HttpAcquirer {
    async fn acquire(&self, url: &Url) -> Result<AcquisitionResult> {
        let start = Instant::now();
        let client = self.client()?;

        debug!(url = %url, verify_tls = self.config.verify_tls, "sending GET request");

        let response = client
            .get(url.clone())
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| self.classify(e))?
            .error_for_status()
            .map_err(|e| self.classify(e))?;

        let declared_media_type = response.headers().get(CONTENT_TYPE).and_then(header_media_type);
        let raw_content = response.text().await.map_err(|e| self.classify(e))?;

        info!(
            url = %url,
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = raw_content.len(),
            media_type = declared_media_type.as_deref().unwrap_or("-"),
            "content fetched"
        );

        Ok(AcquisitionResult { raw_content, declared_media_type })
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

fn header_media_type(value: &HeaderValue) -> Option<String> {
    value.to_str().ok().and_then(media_type)
}

/// Strips parameters from a Content-Type value: `text/html; charset=utf-8` → `text/html`.
pub fn media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() { None } else { Some(essence.to_ascii_lowercase()) }
}
