//! Waysense - assistive obstacle-detection client
//!
//! Streams camera frames to a remote prediction service and turns the
//! returned distances into spoken and vibration alerts.
//!
//! # Usage
//!
//! ```bash
//! # Run against a local predictor with synthetic frames
//! cargo run --release -- --endpoint ws://127.0.0.1:8000/ws/predict
//!
//! # Replay captured JPEG frames from a directory
//! cargo run --release -- --frames-dir captures/walk-01
//! ```
//!
//! # Environment Variables
//!
//! - `WAYSENSE_CONFIG`: Path to a TOML config file
//! - `WAYSENSE_ENDPOINT`: Override the predictor endpoint URL
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waysense::config::{self, ClientConfig};
use waysense::feedback::{FeedbackCoordinator, LoggingSpeech, LoggingVibration};
use waysense::pipeline::{FrameSource, JpegDirSource, PipelineRunner, SyntheticSource};
use waysense::streaming::StreamingClient;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "waysense")]
#[command(about = "Waysense assistive obstacle-detection client")]
#[command(version)]
struct CliArgs {
    /// Override the predictor endpoint URL (ws:// or wss://)
    #[arg(long, env = "WAYSENSE_ENDPOINT")]
    endpoint: Option<String>,

    /// Replay JPEG frames from this directory instead of synthetic frames
    #[arg(long, value_name = "DIR")]
    frames_dir: Option<PathBuf>,

    /// Stop after this many synthetic frames (default: unbounded)
    #[arg(long)]
    frame_count: Option<u64>,

    /// Override the capture interval (ms)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Pretend the platform has no vibration hardware
    #[arg(long)]
    no_vibration: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let mut cfg = ClientConfig::load();
    if let Some(endpoint) = args.endpoint {
        cfg.endpoint.url = endpoint;
    }
    if let Some(interval_ms) = args.interval_ms {
        cfg.capture.interval_ms = interval_ms;
    }
    cfg.validate().context("Invalid configuration")?;
    config::init(cfg);
    let cfg = config::get();

    info!(
        endpoint = %cfg.endpoint.url,
        interval_ms = cfg.capture.interval_ms,
        "Starting waysense client"
    );

    let client = StreamingClient::new(cfg.endpoint.url.clone(), &cfg.backoff);
    let coordinator = Arc::new(FeedbackCoordinator::new(
        Arc::new(LoggingSpeech),
        Arc::new(LoggingVibration::new(!args.no_vibration)),
        cfg.speech.clone(),
    ));

    let source: Box<dyn FrameSource> = if let Some(dir) = args.frames_dir {
        Box::new(JpegDirSource::open(&dir)?)
    } else if let Some(count) = args.frame_count {
        Box::new(SyntheticSource::with_frame_count(count))
    } else {
        Box::new(SyntheticSource::new())
    };

    client.connect().await;

    let runner = PipelineRunner::new(
        client.clone(),
        coordinator,
        Duration::from_millis(cfg.capture.interval_ms),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C received — shutting down");
        shutdown.cancel();
    });

    let stats = runner.run(source, cancel).await;
    client.dispose();

    info!(
        frames = stats.frames_captured,
        alerts = stats.alerts_delivered,
        "Shutdown complete"
    );
    Ok(())
}
