//! promtrack exporter
//!
//! Standalone process exporter:
//! - Config from `$PROMTRACK_CONFIG` (default `promtrack.yaml`)
//! - Scrape endpoint on `listen_host:port`
//! - Process probe on `probe_interval_ms`

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use promtrack_core::MetricRegistry;
use promtrack_tracker::{config, Tracker};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load().expect("config load failed");

    let registry = Arc::new(MetricRegistry::new());
    let (tracker, tasks) = Tracker::start(cfg, registry)
        .await
        .expect("tracker start failed");

    tracing::info!(name = %tracker.name(), addr = ?tasks.local_addr(), "promtrack starting");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tasks.shutdown();
}
