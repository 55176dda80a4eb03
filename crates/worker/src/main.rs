//! offcache deploy entry point.
//!
//! Boots a worker for the configured cache version, installs (precaches
//! the app shell) and activates it (collects old namespaces), then prints
//! the resulting namespace stats. Logging goes to stderr so stdout stays
//! machine-readable.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::AppConfig;
use offcache_worker::{LogSink, Worker};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(namespace = %config.namespace(), db = %config.db_path.display(), "starting offcache deploy");

    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Worker::new(&config, fetcher, Arc::new(LogSink)).await?;

    let stored = worker.handle_install().await?;
    let removed = worker.handle_activate().await?;
    worker.drain_tasks().await;

    let stats = worker.cache_stats().await?;
    tracing::info!(stored, removed, entries = stats.count, "deploy complete");
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
