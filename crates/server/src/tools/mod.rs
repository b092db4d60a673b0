//! MCP tool implementations.
//!
//! This module contains all tools exposed by the triwulan-mcp server. Each
//! tool receives the shared [`Monitor`](triwulan_client::Monitor) and answers
//! with a single pretty-printed JSON text block.

pub mod history;
pub mod scrape;
pub mod stats;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use triwulan_core::Error;

pub use history::{HistoryParams, clear_impl, history_impl, latest_impl, trends_impl};
pub use scrape::scrape_impl;
pub use stats::stats_impl;

/// Serialize a tool output into a successful call result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
