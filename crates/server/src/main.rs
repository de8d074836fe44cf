mod app;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use joblens_core::{AcquireStrategy, Pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, router};

/// HTTP service for job-posting extraction
#[derive(Parser, Debug)]
#[command(name = "joblens-server")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "JOBLENS_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Acquisition strategy (direct, browser)
    #[arg(long, env = "JOBLENS_STRATEGY", default_value = "direct")]
    strategy: AcquireStrategy,

    /// Skip TLS certificate verification when fetching pages
    #[arg(long, env = "JOBLENS_INSECURE")]
    insecure: bool,

    /// Fetch and page-load timeout in seconds
    #[arg(long, env = "JOBLENS_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Chromium executable for the browser strategy
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Try pandoc before the built-in converters
    #[arg(long, env = "JOBLENS_PANDOC")]
    pandoc: bool,

    /// Model name
    #[arg(long, env = "JOBLENS_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Sampling temperature
    #[arg(long, env = "JOBLENS_TEMPERATURE", default_value = "0.1")]
    temperature: f32,

    /// Model provider API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model provider base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut builder = PipelineConfig::builder()
            .strategy(self.strategy)
            .timeout(self.timeout)
            .verify_tls(!self.insecure)
            .use_pandoc(self.pandoc)
            .model(&self.model)
            .temperature(self.temperature)
            .api_key(&self.api_key)
            .base_url(&self.base_url);

        if let Some(chrome) = &self.chrome {
            builder = builder.chrome_executable(chrome);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let args = Args::parse();
    let config = args.pipeline_config();
    tracing::info!(strategy = %config.strategy, model = %config.model.model, "building pipeline");

    let pipeline = Pipeline::from_config(&config).context("Failed to build pipeline")?;
    let app = router(AppState::new(Arc::new(pipeline)));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    tracing::info!("listening on http://{}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
