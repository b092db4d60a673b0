//! triwulan-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;
use triwulan_client::Monitor;
use triwulan_core::AppConfig;

mod handler;
mod tools;

/// How often the background task checks whether an automatic cycle is due.
const AUTO_REFRESH_POLL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(base_url = %config.base_url, "Starting triwulan-mcp server on stdio transport");

    let monitor = Arc::new(Mutex::new(Monitor::from_config(&config)?));
    tokio::spawn(auto_refresh(monitor.clone()));

    let handler = handler::TriwulanServer::new(monitor);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Runs due cycles in the background. Skips a tick while a tool holds the monitor.
async fn auto_refresh(monitor: Arc<Mutex<Monitor>>) {
    let mut interval = tokio::time::interval(AUTO_REFRESH_POLL);
    loop {
        interval.tick().await;
        let Ok(mut monitor) = monitor.try_lock() else {
            tracing::debug!("monitor busy, skipping auto-refresh check");
            continue;
        };
        if let Some(report) = monitor.tick(chrono::Utc::now()).await {
            tracing::info!(status = ?report.snapshot.status(), "auto-refresh cycle finished");
        }
    }
}
