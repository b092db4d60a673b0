//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TRIWULAN_*)
//! 2. TOML config file (if TRIWULAN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::model::Metric;
use crate::rules::{RuleSet, ValidationRule};

mod validation;

pub use validation::ConfigError;

/// Longest accepted auto-refresh interval (one week).
pub const MAX_AUTO_REFRESH_MINUTES: u64 = 7 * 24 * 60;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TRIWULAN_*)
/// 2. TOML config file (if TRIWULAN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the bank's public website.
    ///
    /// Set via TRIWULAN_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pages searched for report links, in order of preference.
    #[serde(default = "default_candidate_paths")]
    pub candidate_paths: Vec<String>,

    /// Investor-relations page used when no report link is found anywhere.
    #[serde(default = "default_investor_relations_path")]
    pub investor_relations_path: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via TRIWULAN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header for HTTP requests.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TRIWULAN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Whether to respect robots.txt rules.
    ///
    /// Set via TRIWULAN_RESPECT_ROBOTS environment variable.
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Minimum spacing between outbound requests in milliseconds.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Number of snapshots kept in memory.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Whether a PDF-only cycle produces an estimated snapshot instead of an error.
    #[serde(default = "default_true")]
    pub estimate_fallback: bool,

    /// Interval between automatic scrape cycles in minutes.
    #[serde(default = "default_auto_refresh_minutes")]
    pub auto_refresh_minutes: u64,

    /// Per-metric plausibility range overrides.
    ///
    /// ```toml
    /// [rules.car]
    /// min = 8.0
    /// max = 50.0
    /// ```
    #[serde(default)]
    pub rules: BTreeMap<Metric, ValidationRule>,
}

fn default_base_url() -> String {
    "https://www.bankmuamalat.co.id".into()
}

fn default_candidate_paths() -> Vec<String> {
    vec![
        "/hubungan-investor/laporan-keuangan/laporan-triwulanan".into(),
        "/hubungan-investor/laporan-keuangan".into(),
        "/hubungan-investor".into(),
    ]
}

fn default_investor_relations_path() -> String {
    "/hubungan-investor".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

fn default_accept_language() -> String {
    "id,en-US;q=0.7,en;q=0.3".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_min_request_interval_ms() -> u64 {
    1_000
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_auto_refresh_minutes() -> u64 {
    240
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            candidate_paths: default_candidate_paths(),
            investor_relations_path: default_investor_relations_path(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            respect_robots: true,
            min_request_interval_ms: default_min_request_interval_ms(),
            history_capacity: default_history_capacity(),
            estimate_fallback: true,
            auto_refresh_minutes: default_auto_refresh_minutes(),
            rules: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_minutes.saturating_mul(60))
    }

    /// Candidate page URLs, in order.
    pub fn candidate_urls(&self) -> Vec<String> {
        self.candidate_paths.iter().map(|p| self.join(p)).collect()
    }

    pub fn investor_relations_url(&self) -> String {
        self.join(&self.investor_relations_path)
    }

    /// Validation rules with configured overrides applied.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::with_overrides(&self.rules)
    }

    fn join(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TRIWULAN_`
    /// 2. TOML file from `TRIWULAN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TRIWULAN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TRIWULAN_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "https://www.bankmuamalat.co.id");
        assert_eq!(config.candidate_paths.len(), 3);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.auto_refresh_minutes, 240);
        assert!(config.accept_language.starts_with("id"));
        assert!(config.respect_robots);
        assert!(config.estimate_fallback);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.auto_refresh_interval(), Duration::from_secs(4 * 60 * 60));
    }

    #[test]
    fn test_auto_refresh_interval_saturates() {
        let config = AppConfig { auto_refresh_minutes: u64::MAX, ..Default::default() };
        assert_eq!(config.auto_refresh_interval(), Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_candidate_urls() {
        let config = AppConfig { base_url: "http://127.0.0.1:8080/".into(), ..Default::default() };
        let urls = config.candidate_urls();
        assert_eq!(urls[0], "http://127.0.0.1:8080/hubungan-investor/laporan-keuangan/laporan-triwulanan");
        assert_eq!(urls[2], "http://127.0.0.1:8080/hubungan-investor");
        assert_eq!(config.investor_relations_url(), "http://127.0.0.1:8080/hubungan-investor");
    }

    #[test]
    fn test_absolute_candidate_kept() {
        let config = AppConfig { candidate_paths: vec!["https://mirror.example/ir".into()], ..Default::default() };
        assert_eq!(config.candidate_urls(), vec!["https://mirror.example/ir".to_string()]);
    }

    #[test]
    fn test_rule_set_overrides() {
        let mut rules = BTreeMap::new();
        rules.insert(Metric::Car, ValidationRule::new(5.0, 40.0));
        let config = AppConfig { rules, ..Default::default() };
        assert_eq!(config.rule_set().rule(Metric::Car), ValidationRule::new(5.0, 40.0));
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "triwulan.toml",
                r#"
                    history_capacity = 12

                    [rules.car]
                    min = 6.0
                    max = 45.0
                "#,
            )?;
            jail.set_env("TRIWULAN_CONFIG_FILE", "triwulan.toml");
            jail.set_env("TRIWULAN_TIMEOUT_MS", "5000");
            jail.set_env("TRIWULAN_BASE_URL", "http://localhost:9000");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.history_capacity, 12);
            assert_eq!(config.timeout_ms, 5000);
            assert_eq!(config.base_url, "http://localhost:9000");
            assert_eq!(config.rule_set().rule(Metric::Car), ValidationRule::new(6.0, 45.0));
            Ok(())
        });
    }
}
