//! scrape_stats tool implementation.

use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use tokio::sync::Mutex;
use triwulan_client::Monitor;

use super::json_result;

/// Output from the scrape_stats tool.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub total_scrapes: u64,
    pub successes: u64,
    pub error_count: u64,
    /// Successful cycles over all cycles, 0.0 before the first one.
    pub success_rate: f64,
    pub history_size: usize,
    pub history_capacity: usize,
    pub last_scrape_at: Option<DateTime<Utc>>,
    pub auto_refresh_enabled: bool,
    pub auto_refresh_minutes: u64,
}

/// Implementation of the scrape_stats tool.
pub async fn stats_impl(monitor: &Mutex<Monitor>) -> Result<CallToolResult, McpError> {
    let monitor = monitor.lock().await;
    let stats = monitor.stats();
    let auto_refresh = monitor.auto_refresh();

    json_result(&StatsOutput {
        total_scrapes: stats.total_scrapes,
        successes: stats.successes,
        error_count: stats.error_count,
        success_rate: stats.success_rate(),
        history_size: monitor.history().len(),
        history_capacity: monitor.history().capacity(),
        last_scrape_at: monitor.last_scrape_at(),
        auto_refresh_enabled: auto_refresh.enabled,
        auto_refresh_minutes: auto_refresh.interval.as_secs() / 60,
    })
}
