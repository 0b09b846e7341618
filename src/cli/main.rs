//! Background removal gateway CLI
//!
//! Parses arguments (with environment fallbacks), installs the tracing
//! subscriber, initializes backends once and serves until Ctrl+C.

use super::config::CliConfigBuilder;
use crate::backends::remote::DEFAULT_REMOTE_ENDPOINT;
use crate::config::{ServiceConfig, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use crate::input::ImageIntake;
use crate::models::{ModelCatalog, DEFAULT_MODEL};
use crate::server::{self, AppState};
use crate::tracing_config::{TracingConfig, TracingFormat};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

/// HTTP gateway for background removal with ordered backend fallback
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-gateway")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "BGREMOVE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "BGREMOVE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Backends to try, in priority order
    #[arg(
        long,
        env = "BGREMOVE_BACKENDS",
        value_enum,
        value_delimiter = ',',
        default_value = "local,remote"
    )]
    pub backend_order: Vec<BackendChoice>,

    /// Segmentation model for the local backend
    #[arg(short, long, env = "BGREMOVE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Model file for the local backend [default: ~/.u2net/<model>.onnx]
    #[arg(long, env = "BGREMOVE_MODEL_PATH", value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Keep serving with remote backends when the local model cannot be loaded
    #[arg(long)]
    pub optional_local_model: bool,

    /// Remote inference endpoints, tried in the given order
    #[arg(
        long = "remote-endpoint",
        env = "BGREMOVE_REMOTE_ENDPOINTS",
        value_delimiter = ',',
        default_value = DEFAULT_REMOTE_ENDPOINT
    )]
    pub remote_endpoints: Vec<String>,

    /// API token sent as bearer credential to remote endpoints
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Timeout for each backend call, in seconds
    #[arg(long, env = "BGREMOVE_BACKEND_TIMEOUT", default_value_t = 60)]
    pub backend_timeout: u64,

    /// Timeout for fetching image URLs, in seconds
    #[arg(long, env = "BGREMOVE_FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// Allowed CORS origins ("*" for any)
    #[arg(long = "allowed-origin", env = "BGREMOVE_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "BGREMOVE_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Console)]
    pub log_format: TracingFormat,

    /// Log filter directives; overrides --verbose
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// List supported models and exit
    #[arg(long)]
    pub list_models: bool,
}

/// Backend kinds selectable on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// In-process segmentation model
    Local,
    /// Every configured remote endpoint
    Remote,
}

/// Main CLI entry point
///
/// # Errors
/// - Invalid arguments or configuration
/// - Local model cannot be loaded
/// - Listener cannot be bound
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_env_filter(cli.log_filter.clone().unwrap_or_default())
        .init()
        .context("Failed to initialize tracing")?;

    if cli.list_models {
        list_models();
        return Ok(());
    }

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    run(config).await
}

/// Initialize backends from `config` and serve until Ctrl+C
///
/// # Errors
/// - Backend initialization or server failure
pub async fn run(config: ServiceConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind_addr(),
        backends = ?config.backends,
        "Starting background removal gateway"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let backends = config
        .build_dispatcher(&client)
        .context("Failed to initialize backends")?;
    if backends.dispatcher.backends().is_empty() {
        warn!("No backends available; removal requests will fail until one is configured");
    }

    let intake = ImageIntake::new(config.fetch_timeout).context("Failed to create HTTP client")?;
    let state = AppState::new(backends.dispatcher, intake, backends.local_model_ready);

    server::serve(&config, state, shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        },
    }
}

fn list_models() {
    println!("Supported models:");
    for info in ModelCatalog::all() {
        let [height, width] = info.preprocessing.target_size;
        println!(
            "  {:<18} {:>6}  {}x{}  {}",
            info.name, info.size, width, height, info.description
        );
        println!(
            "  {:<18} {}",
            "",
            ModelCatalog::default_model_path(info.name).display()
        );
    }
}
