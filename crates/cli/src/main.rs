mod echo;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use joblens_core::{AcquireStrategy, Normalizer, Pipeline, PipelineConfig, acquirer_for, prepare};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fetch a job posting and extract a structured job record
#[derive(Parser, Debug)]
#[command(name = "joblens")]
#[command(version)]
#[command(about = "Extract structured job records from job-posting pages", long_about = None)]
struct Args {
    /// URL of the job posting
    #[arg(value_name = "URL")]
    url: String,

    /// Acquisition strategy (direct, browser)
    #[arg(long, env = "JOBLENS_STRATEGY", default_value = "direct", value_name = "STRATEGY")]
    strategy: AcquireStrategy,

    /// Render the page in headless Chromium (same as --strategy browser)
    #[arg(long)]
    render: bool,

    /// Skip TLS certificate verification
    #[arg(long, env = "JOBLENS_INSECURE")]
    insecure: bool,

    /// Fetch and page-load timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests and the browser
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Chromium executable for the browser strategy
    #[arg(long, env = "CHROME", value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Try pandoc before the built-in converters
    #[arg(long)]
    pandoc: bool,

    /// Model name
    #[arg(long, env = "JOBLENS_MODEL", default_value = "gpt-4o-mini", value_name = "MODEL")]
    model: String,

    /// Sampling temperature
    #[arg(long, env = "JOBLENS_TEMPERATURE", default_value = "0.1", value_name = "TEMP")]
    temperature: f32,

    /// Model provider API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Model provider base URL
    #[arg(long, env = "OPENAI_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Stop after normalization and print the text the model would receive
    #[arg(long)]
    normalize_only: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long)]
    compact: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let strategy = if self.render { AcquireStrategy::Browser } else { self.strategy };
        let mut builder = PipelineConfig::builder()
            .strategy(strategy)
            .timeout(self.timeout)
            .verify_tls(!self.insecure)
            .use_pandoc(self.pandoc)
            .model(&self.model)
            .temperature(self.temperature);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(chrome) = &self.chrome {
            builder = builder.chrome_executable(chrome);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.api_key(api_key);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url);
        }

        builder.build()
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "joblens_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let config = args.pipeline_config();
    let start = Instant::now();

    let output = if args.normalize_only {
        if args.verbose {
            echo::print_step(1, 2, &format!("Normalizing {}", args.url.bright_white().underline()));
            echo::print_field("Strategy", &config.strategy.to_string());
        }

        let acquirer = acquirer_for(&config).context("Failed to build acquirer")?;
        let normalizer = Normalizer::from_config(&config.normalize);
        if args.verbose {
            echo::print_field("Converters", &normalizer.converter_names().join(" → "));
        }

        let text = match prepare(acquirer.as_ref(), &normalizer, &args.url).await {
            Ok(text) => text,
            Err(e) => {
                echo::print_error(&format!("{} [{}]", e, e.kind()));
                return Err(e).context("Failed to normalize posting");
            }
        };

        if args.verbose {
            echo::print_field("Size", &echo::format_size(text.len()));
            echo::print_timing("Elapsed", start.elapsed());
            eprintln!();
            echo::print_step(2, 2, "Writing output");
        }
        text
    } else {
        if args.verbose {
            echo::print_step(1, 3, "Building pipeline");
            echo::print_field("Strategy", &config.strategy.to_string());
            echo::print_field("Model", &config.model.model);
            eprintln!();
        }

        let pipeline = Arc::new(Pipeline::from_config(&config).context("Failed to build pipeline")?);

        if args.verbose {
            echo::print_step(2, 3, &format!("Extracting {}", args.url.bright_white().underline()));
        }

        let record = match pipeline.run(&args.url).await {
            Ok(record) => record,
            Err(e) => {
                echo::print_error(&format!("{} [{}]", e, e.kind()));
                return Err(e).context("Failed to extract job record");
            }
        };

        if args.verbose {
            echo::print_timing("Elapsed", start.elapsed());
            echo::print_record_summary(&record);
            echo::print_step(3, 3, "Writing output");
        }

        let json = if args.compact { serde_json::to_string(&record) } else { serde_json::to_string_pretty(&record) };
        json.context("Failed to serialize record")?
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            println!("{}", output);
        }
    }

    Ok(())
}
