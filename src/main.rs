//! Dry-run inspector for the update-API rewrite engine.
//!
//! Loads a rewrite configuration and reports how a given URL would be
//! classified and rerouted, without dispatching anything.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wp_api_rewrite::diagnostics::MemorySink;
use wp_api_rewrite::{
    ApiRewrite, HttpResponse, HttpTransport, OutboundRequest, RewriteConfig, StaticRegistry,
    TransportError,
};

#[derive(Parser, Debug)]
#[command(name = "wp-api-rewrite")]
#[command(
    author,
    version,
    about = "Dry-run inspector for the update-API rewrite engine"
)]
struct Args {
    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URL to classify and rewrite without dispatching
    #[arg(short, long)]
    url: Option<String>,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// The inspector never dispatches; any attempt is a bug.
struct DryRunTransport;

#[async_trait]
impl HttpTransport for DryRunTransport {
    async fn request(
        &self,
        _url: &str,
        _request: &OutboundRequest,
    ) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connection(
            "dry-run transport does not dispatch".to_string(),
        ))
    }
}

fn print_example_config() {
    let example = r#"# Update-API rewrite configuration example

# Host whose outbound calls are intercepted.
default_host: "api.wordpress.org"

# Substitute API host, scheme included. The literal value "debug" keeps
# traffic on the default host and only logs decisions.
target_host: "https://my.api.org"

# Bearer token attached to rerouted requests when non-empty.
api_key: ""

# Force sslverify off on rerouted requests.
disable_ssl_verify: false

compat:
  # Leave a call alone when another interceptor already produced a response.
  skip_if_response_preset: false

debug:
  # Master switch for the diagnostics channel.
  enabled: false
  # Entry categories to record: string, request, response.
  types: [string]
  # Append a cache_buster query parameter to rerouted URLs.
  cache_buster: false
"#;
    println!("{}", example);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    if args.example_config {
        print_example_config();
        return Ok(());
    }

    let config = if let Some(config_path) = &args.config {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        if config_path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            RewriteConfig::from_yaml(&content)?
        } else {
            RewriteConfig::from_json(&content)?
        }
    } else {
        RewriteConfig::default()
    };

    if args.validate {
        if !config.is_active() {
            info!("Configuration is valid; rewriting is disabled (no target host)");
            return Ok(());
        }
        config
            .target_url()
            .with_context(|| format!("Invalid target host: {}", config.effective_target()))?;
        info!("Configuration is valid");
        return Ok(());
    }

    let url = args
        .url
        .context("Pass --url to inspect, or --validate / --example-config")?;

    let rewriter = ApiRewrite::new(
        config,
        Arc::new(DryRunTransport),
        Arc::new(StaticRegistry::new()),
        Arc::new(MemorySink::new()),
    );

    let plan = rewriter.plan(&url)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
