//! quarterly_scrape tool implementation.
//!
//! Runs one scrape cycle against the live site and returns the snapshot
//! together with the cycle's warnings and state trace.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use tokio::sync::Mutex;
use triwulan_client::Monitor;
use triwulan_core::Error;

use super::json_result;

/// Implementation of the quarterly_scrape tool.
///
/// A cycle that fails still answers successfully with an error snapshot; only
/// a second scrape started while one is running is rejected.
pub async fn scrape_impl(monitor: &Mutex<Monitor>) -> Result<CallToolResult, McpError> {
    let mut monitor = monitor.try_lock().map_err(|_| Error::ScrapeInProgress)?;
    let report = monitor.run_cycle().await;

    tracing::info!(
        status = ?report.snapshot.status(),
        warnings = report.warnings.len(),
        history = monitor.history().len(),
        "scrape cycle finished"
    );

    json_result(&report)
}
