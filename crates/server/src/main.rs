//! aerofisc-sw entry point.
//!
//! Boots the offline worker, runs its install and activate events once, and
//! serves the event adapter over MCP on stdio. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use aerofisc_client::{FetchClient, FetchConfig, ServiceWorker, WorkerConfig};
use aerofisc_core::{AppConfig, CacheDb};
use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting aerofisc-sw on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let worker = Arc::new(ServiceWorker::init(WorkerConfig::from_app(&config)?, cache, Arc::new(fetcher))?);

    match worker.install().await {
        Ok(report) => {
            tracing::info!(store = %report.static_store, assets = report.precached.len(), "installed");
            if let Err(e) = worker.activate().await {
                tracing::error!(error = %e, "activation failed; worker stays waiting");
            }
        }
        Err(e) => tracing::error!(error = %e, "install failed; worker is redundant until reinstalled"),
    }

    let handler = handler::WorkerServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.teardown().await;

    Ok(())
}
