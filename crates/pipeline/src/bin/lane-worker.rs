//! lane-worker: runs one queue importer stage with hot-reloadable behavior.
//!
//! Behavior scripts are read from `<script-root>/<category>/<name>` and
//! reloaded after edits settle for the debounce window. Runs until Ctrl-C,
//! or for `--run-for-secs` seconds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use lane_behavior::TracingHookSink;
use lane_core::config::{load_dotenv, Config};
use lane_pipeline::{PipelineNode, QueueImporter};
use lane_scheduler::LogSink;

// ── CLI ─────────────────────────────────────────────────────────────

/// Ordered-lane stage runner. Flags override the `LANE_*` environment.
#[derive(Parser, Debug)]
#[command(name = "lane-worker", version, about)]
struct Cli {
    /// Stage name (and leaf directory of its scripts).
    #[arg(long)]
    name: Option<String>,

    /// Root directory holding `<category>/<name>` script directories.
    #[arg(long)]
    script_root: Option<PathBuf>,

    /// Use the unordered pool scheduler instead of the ordered lane.
    #[arg(long)]
    concurrent: Option<bool>,

    /// Quiet period after source edits before reloading, in milliseconds.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Producer period in milliseconds (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Exit after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    run_for_secs: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.node.name = name.clone();
        }
        if let Some(root) = &self.script_root {
            config.node.script_root = root.clone();
        }
        if let Some(concurrent) = self.concurrent {
            config.node.concurrent = concurrent;
        }
        if let Some(ms) = self.debounce_ms {
            config.watcher.debounce_ms = ms;
        }
        if let Some(ms) = self.interval_ms {
            config.node.interval_ms = ms;
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.apply(&mut config);
    config.log_summary();

    let importer = QueueImporter::from_config(&config, Arc::new(TracingHookSink), Arc::new(LogSink))
        .with_context(|| format!("failed to start stage from {}", config.node.source_dir().display()))?;

    let importer = Arc::new(importer);
    importer.clone().run()?;
    info!(node = %importer.name(), "lane-worker running");

    match cli.run_for_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
            info!("shutdown signal received");
        }
    }

    let stopping = importer.clone();
    tokio::task::spawn_blocking(move || stopping.stop()).await?;
    let stats = importer.scheduler().stats();
    info!(
        produced = importer.produced(),
        completed = stats.completed,
        failed = stats.failed,
        "lane-worker exited cleanly"
    );
    Ok(())
}
