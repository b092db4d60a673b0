//! History tools: latest snapshot, recent snapshots, trends and clearing.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use triwulan_client::Monitor;
use triwulan_core::{Error, Metric, QuarterlySnapshot};

use super::json_result;

/// Parameters for the quarterly_history tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HistoryParams {
    /// Number of most recent snapshots to return (default: all).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Output from the quarterly_history tool.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput<'a> {
    /// Snapshots held in total, before the limit is applied.
    pub total: usize,
    /// The selected snapshots, oldest first.
    pub snapshots: Vec<&'a QuarterlySnapshot>,
}

/// Output from the quarterly_trends tool.
#[derive(Debug, Clone, Serialize)]
pub struct TrendsOutput {
    /// Snapshots the trends were computed from.
    pub window: usize,
    /// Percent change per metric, keyed by metric name.
    pub trends: BTreeMap<Metric, f64>,
}

/// Output from the history_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearOutput {
    /// Number of snapshots removed.
    pub cleared: usize,
}

/// Implementation of the quarterly_latest tool.
pub async fn latest_impl(monitor: &Mutex<Monitor>) -> Result<CallToolResult, McpError> {
    let monitor = monitor.lock().await;
    let latest = monitor.history().latest().ok_or(Error::HistoryEmpty)?;
    json_result(latest)
}

/// Implementation of the quarterly_history tool.
pub async fn history_impl(monitor: &Mutex<Monitor>, params: HistoryParams) -> Result<CallToolResult, McpError> {
    if params.limit == Some(0) {
        return Err(Error::InvalidInput("limit must be at least 1".into()).into());
    }

    let monitor = monitor.lock().await;
    let history = monitor.history();
    let limit = params.limit.unwrap_or(history.len());
    let output = HistoryOutput { total: history.len(), snapshots: history.recent(limit).collect() };
    json_result(&output)
}

/// Implementation of the quarterly_trends tool.
///
/// Trends stay empty until three snapshots have been recorded.
pub async fn trends_impl(monitor: &Mutex<Monitor>) -> Result<CallToolResult, McpError> {
    let monitor = monitor.lock().await;
    let history = monitor.history();
    let output = TrendsOutput { window: history.len().min(3), trends: history.trends() };
    json_result(&output)
}

/// Implementation of the history_clear tool.
pub async fn clear_impl(monitor: &Mutex<Monitor>) -> Result<CallToolResult, McpError> {
    let mut monitor = monitor.try_lock().map_err(|_| Error::ScrapeInProgress)?;
    let cleared = monitor.history().len();
    monitor.clear();
    json_result(&ClearOutput { cleared })
}
