//! Headless-browser acquisition strategy.
//!
//! [`BrowserAcquirer`] launches a fresh, isolated browser for every call,
//! renders the page and reads back the DOM. The browser is closed on every
//! exit path before the call returns: success, page-load timeout and
//! automation error alike.
//!
//! The browser itself sits behind [`BrowserLauncher`] / [`BrowserSession`] so
//! the strategy can run against Chromium ([`ChromiumLauncher`], `browser`
//! feature) or any other engine.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::{AcquisitionResult, Acquirer};
use crate::{JoblensError, Result};

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a new browser with its own profile. Never reuses a session.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A single launched browser.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to `url` and waits for the page to finish loading.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Returns the fully rendered document markup.
    async fn content(&mut self) -> Result<String>;

    /// Media type the rendered document reports, if it can be read.
    async fn media_type(&mut self) -> Option<String>;

    /// Tears the browser down and releases its process.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Browser-render strategy.
pub struct BrowserAcquirer<L> {
    launcher: L,
    timeout: u64,
}

impl<L: BrowserLauncher> BrowserAcquirer<L> {
    /// `timeout` bounds navigation and content extraction, in seconds.
    pub fn new(launcher: L, timeout: u64) -> Self {
        Self { launcher, timeout }
    }

    async fn render(&self, session: &mut dyn BrowserSession, url: &Url) -> Result<AcquisitionResult> {
        let deadline = Duration::from_secs(self.timeout);
        let rendered = tokio::time::timeout(deadline, async {
            session.navigate(url).await?;
            let raw_content = session.content().await?;
            let declared_media_type = session.media_type().await;
            Ok::<_, JoblensError>(AcquisitionResult { raw_content, declared_media_type })
        })
        .await;

        match rendered {
            Ok(result) => result,
            Err(_) => Err(JoblensError::Timeout { operation: "page load".to_string(), timeout: self.timeout }),
        }
    }
}

#[async_trait]
impl<L: BrowserLauncher> Acquirer for BrowserAcquirer<L> {
    async fn acquire(&self, url: &Url) -> Result<AcquisitionResult> {
        let start = Instant::now();
        let mut session = self.launcher.launch().await?;
        debug!(url = %url, "browser launched");

        let outcome = self.render(session.as_mut(), url).await;

        if let Err(e) = session.close().await {
            warn!(url = %url, error = %e, "browser teardown reported an error");
        }

        let result = outcome?;
        info!(
            url = %url,
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = result.raw_content.len(),
            media_type = result.declared_media_type.as_deref().unwrap_or("-"),
            "page rendered"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

#[cfg(feature = "browser")]
pub use chromium::{ChromiumLauncher, ChromiumSession};

#[cfg(feature = "browser")]
mod chromium {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::error::CdpError;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::warn;
    use url::Url;

    use super::{BrowserLauncher, BrowserSession};
    use crate::fetch::{FetchConfig, media_type};
    use crate::{JoblensError, Result};

    static NEXT_PROFILE: AtomicU64 = AtomicU64::new(0);

    /// Browser profile directory, removed when dropped. Covers sessions that
    /// are dropped mid-flight without reaching `close`.
    struct ProfileDir(PathBuf);

    impl ProfileDir {
        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for ProfileDir {
        fn drop(&mut self) {
            match std::fs::remove_dir_all(&self.0) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %self.0.display(), error = %e, "failed to remove browser profile"),
            }
        }
    }

    /// Launches headless Chromium through chromiumoxide.
    #[derive(Debug, Clone)]
    pub struct ChromiumLauncher {
        config: FetchConfig,
    }

    impl ChromiumLauncher {
        pub fn new(config: FetchConfig) -> Self {
            Self { config }
        }

        fn profile_dir() -> ProfileDir {
            let n = NEXT_PROFILE.fetch_add(1, Ordering::Relaxed);
            ProfileDir(std::env::temp_dir().join(format!("joblens-chromium-{}-{}", std::process::id(), n)))
        }

        fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
            let mut builder = BrowserConfig::builder()
                .user_data_dir(profile_dir)
                .request_timeout(Duration::from_secs(self.config.timeout))
                .arg(format!("--user-agent={}", self.config.user_agent))
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-extensions")
                .arg("--no-first-run");

            if !self.config.verify_tls {
                builder = builder.arg("--ignore-certificate-errors");
            }
            if let Some(path) = &self.config.chrome_executable {
                builder = builder.chrome_executable(path);
            }

            builder
                .build()
                .map_err(|e| JoblensError::acquisition(format!("invalid browser configuration: {e}"), None))
        }
    }

    #[async_trait]
    impl BrowserLauncher for ChromiumLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            let profile_dir = Self::profile_dir();
            let config = self.browser_config(profile_dir.path())?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| JoblensError::acquisition("failed to launch Chromium", Some(e.into())))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Box::new(ChromiumSession {
                browser,
                handler,
                page: None,
                profile_dir,
                timeout: self.config.timeout,
            }))
        }
    }

    /// One Chromium process with a private profile directory.
    pub struct ChromiumSession {
        browser: Browser,
        handler: JoinHandle<()>,
        page: Option<Page>,
        profile_dir: ProfileDir,
        timeout: u64,
    }

    impl ChromiumSession {
        fn classify(&self, err: CdpError) -> JoblensError {
            match err {
                CdpError::Timeout => JoblensError::Timeout { operation: "page load".to_string(), timeout: self.timeout },
                other => JoblensError::acquisition("browser automation failed", Some(other.into())),
            }
        }

        fn page(&self) -> Result<&Page> {
            self.page
                .as_ref()
                .ok_or_else(|| JoblensError::acquisition("no page has been opened", None))
        }
    }

    #[async_trait]
    impl BrowserSession for ChromiumSession {
        async fn navigate(&mut self, url: &Url) -> Result<()> {
            let page = self.browser.new_page("about:blank").await.map_err(|e| self.classify(e))?;
            page.goto(url.as_str()).await.map_err(|e| self.classify(e))?;
            self.page = Some(page);
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            let page = self.page()?;
            page.content().await.map_err(|e| self.classify(e))
        }

        async fn media_type(&mut self) -> Option<String> {
            let page = self.page.as_ref()?;
            let value: String = page.evaluate("document.contentType").await.ok()?.into_value().ok()?;
            media_type(&value)
        }

        async fn close(self: Box<Self>) -> Result<()> {
            let mut session = *self;

            if let Some(page) = session.page.take()
                && let Err(e) = page.close().await
            {
                warn!(error = %e, "failed to close page");
            }

            let closed = session.browser.close().await;
            if let Err(e) = session.browser.wait().await {
                warn!(error = %e, "failed to reap Chromium process");
            }
            session.handler.abort();
            drop(session.profile_dir);

            closed
                .map(|_| ())
                .map_err(|e| JoblensError::acquisition("failed to close Chromium", Some(e.into())))
        }
    }

}
