//! Visibility Replay - Drive the tracker from a recorded signal script
//!
//! Reads a JSON-lines script of host signals (list snapshots, change
//! signals, panel / dozing / bar state, expansion and lifecycle events,
//! waits), feeds it through a live tracker and prints every sink call to
//! stdout as one JSON line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Replay a script file
//! visibility-replay --script scripts/scroll.jsonl
//!
//! # Read the script from stdin with a shorter debounce interval
//! cat scripts/scroll.jsonl | visibility-replay --min-interval-ms 100
//!
//! # With config file and verbose logging
//! RUST_LOG=debug visibility-replay --config tracker.toml --script scripts/scroll.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `VISIBILITY_CONFIG`: Configuration file path
//! - `VISIBILITY_MIN_REPORT_INTERVAL_MS`: Minimum spacing between ticks
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

mod output;
mod script;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use visibility_core::{
    default_config_path, load_config_from_path, ConfigOverrides, StaticSource, VisibilityLogger,
};

use output::JsonLinesSink;
use script::{apply_step, parse_script};

/// Visibility Replay - feed a signal script through the visibility tracker
#[derive(Parser, Debug)]
#[command(name = "visibility-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script file (JSON lines); reads stdin when omitted
    #[arg(short = 's', long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "VISIBILITY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimum spacing between ticks, in milliseconds
    #[arg(long, value_name = "MS")]
    min_interval_ms: Option<u64>,
}

fn read_script(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from stdin")?;
            Ok(text)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr; stdout carries the report stream)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visibility_replay=info".parse()?)
                .add_directive("visibility_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;
    let mut overrides = ConfigOverrides::new();
    if let Some(ms) = args.min_interval_ms {
        overrides = overrides.with_min_report_interval_ms(ms);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line override")?;
    info!(
        min_interval_ms = config.min_report_interval_ms,
        source = %config.source(),
        "Configuration loaded"
    );

    let text = read_script(args.script.as_ref())?;
    let steps = parse_script(&text).context("Failed to parse script")?;
    info!(steps = steps.len(), "Replaying script");

    let source = Arc::new(StaticSource::new());
    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let (handle, task) = VisibilityLogger::spawn(source.clone(), sink, &config);

    for step in steps {
        apply_step(step, &handle, &source).await?;
    }

    let status = handle.status().await?;
    handle.shutdown().await?;
    task.await.context("Tracker task failed")?;

    info!(
        ticks = status.ticks,
        coalesced = status.coalesced_signals,
        delivered = status.dispatch.delivered,
        failed = status.dispatch.failed,
        "Replay finished"
    );
    Ok(())
}
