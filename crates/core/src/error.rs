//! Unified error types for triwulan.
//!
//! Each variant carries a stable upper-case code prefix so collaborators can
//! match on the message, and maps to a JSON-RPC error code for the MCP server.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the scraper, monitor and server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Robots.txt disallowed access.
    #[error("ROBOTS_DISALLOWED: {0}")]
    RobotsDisallowed(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Document could not be parsed or yielded nothing usable.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// No financial data could be produced for a snapshot.
    #[error("NO_DATA: {0}")]
    NoData(String),

    /// A scrape cycle is already running.
    #[error("SCRAPE_IN_PROGRESS")]
    ScrapeInProgress,

    /// The history holds no snapshots yet.
    #[error("HISTORY_EMPTY")]
    HistoryEmpty,

    /// JSON encoding failed.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::ExtractFailed(msg) => (-32000, msg.clone()),
            Error::NoData(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::RobotsDisallowed(msg) => (-32005, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::ScrapeInProgress => (-32013, "A scrape cycle is already running".to_string()),
            Error::HistoryEmpty => (-32014, "No snapshots recorded yet".to_string()),
            Error::Serialization(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::HttpError("status 503".to_string());
        assert!(err.to_string().contains("HTTP_ERROR"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::ScrapeInProgress;
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32013);

        let mcp_err: McpError = Error::InvalidInput("limit".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }
}
