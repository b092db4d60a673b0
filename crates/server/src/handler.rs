//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{HistoryParams, clear_impl, history_impl, latest_impl, scrape_impl, stats_impl, trends_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokio::sync::Mutex;
use triwulan_client::Monitor;

/// The main MCP server handler for triwulan-mcp.
#[derive(Clone)]
pub struct TriwulanServer {
    tool_router: ToolRouter<Self>,
    monitor: Arc<Mutex<Monitor>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TriwulanServer {
    /// Create a new server handler around a shared monitor.
    pub fn new(monitor: Arc<Mutex<Monitor>>) -> Self {
        Self { tool_router: Self::tool_router(), monitor }
    }

    #[tool(
        description = "Scrape the bank's latest quarterly financial report now. Returns the snapshot, warnings and the cycle trace."
    )]
    async fn quarterly_scrape(&self) -> Result<CallToolResult, McpError> {
        scrape_impl(&self.monitor).await
    }

    #[tool(description = "Return the most recent successful quarterly snapshot.")]
    async fn quarterly_latest(&self) -> Result<CallToolResult, McpError> {
        latest_impl(&self.monitor).await
    }

    #[tool(description = "Return recorded quarterly snapshots, oldest first. Optionally limited to the newest N.")]
    async fn quarterly_history(&self, params: Parameters<HistoryParams>) -> Result<CallToolResult, McpError> {
        history_impl(&self.monitor, params.0).await
    }

    #[tool(description = "Percent change per metric across the last three snapshots.")]
    async fn quarterly_trends(&self) -> Result<CallToolResult, McpError> {
        trends_impl(&self.monitor).await
    }

    #[tool(description = "Scrape counters, success rate, history size and last scrape time.")]
    async fn scrape_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.monitor).await
    }

    #[tool(description = "Clear the snapshot history and reset the scrape counters.")]
    async fn history_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.monitor).await
    }
}

impl ServerHandler for TriwulanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "triwulan-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Monitors a bank's quarterly financial disclosures. Call quarterly_scrape to fetch, then read results \
                 with quarterly_latest, quarterly_history and quarterly_trends."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
