//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, MAX_AUTO_REFRESH_MINUTES};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url` is not an http(s) URL
    /// - `candidate_paths` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    /// - `history_capacity` is 0
    /// - `auto_refresh_minutes` is 0 or longer than a week
    /// - a rule has `min > max` or a non-finite bound
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid { field: "base_url".into(), reason: "must be an http(s) URL".into() });
        }

        if self.candidate_paths.is_empty() {
            return Err(ConfigError::Invalid {
                field: "candidate_paths".into(),
                reason: "at least one candidate page is required".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "history_capacity".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.auto_refresh_minutes == 0 {
            return Err(ConfigError::Invalid {
                field: "auto_refresh_minutes".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.auto_refresh_minutes > MAX_AUTO_REFRESH_MINUTES {
            return Err(ConfigError::Invalid {
                field: "auto_refresh_minutes".into(),
                reason: format!("cannot exceed {MAX_AUTO_REFRESH_MINUTES} minutes"),
            });
        }

        for (metric, rule) in &self.rules {
            if !rule.min.is_finite() || !rule.max.is_finite() || rule.min > rule.max {
                return Err(ConfigError::Invalid {
                    field: format!("rules.{metric}"),
                    reason: format!("invalid range {rule}"),
                });
            }
        }

        if !self.respect_robots {
            tracing::warn!("robots.txt compliance disabled");
        }

        Ok(())
    }
}
