//! HTTP fetch pipeline with rate limiting and robots.txt compliance.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Safety Gates
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//! - Minimum spacing between requests (default: 1s)
//!
//! ### robots.txt Compliance
//! - Fetch and cache `robots.txt` per host (24h cache).
//! - Evaluate `*` and current User-Agent.

pub mod rate;
pub mod robots;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use rate::RateLimiter;
pub use robots::{RobotsCache, RobotsError};
pub use self::url::{UrlError, canonicalize, resolve_href, same_site};

use triwulan_core::{AppConfig, Error};

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "triwulan/0.1")
    pub user_agent: String,

    /// Accept-Language header (default: Indonesian first)
    pub accept_language: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Whether to respect robots.txt (default: true)
    pub respect_robots: bool,

    /// Minimum spacing between requests (default: 1s)
    pub min_request_interval: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "triwulan/0.1".to_string(),
            accept_language: "id,en-US;q=0.7,en;q=0.3".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(30000),
            max_redirects: 5,
            respect_robots: true,
            min_request_interval: Duration::from_millis(1000),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            respect_robots: config.respect_robots,
            min_request_interval: config.min_request_interval(),
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl From<FetchResponse> for Page {
    fn from(response: FetchResponse) -> Self {
        Page { url: response.final_url, content_type: response.content_type, body: response.bytes }
    }
}

/// A fetched document as seen by the scrape pipeline.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the body was served from (after redirects)
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Page {
    /// Build a page from an in-memory HTML string.
    pub fn html(url: Url, html: impl Into<String>) -> Self {
        Self { url, content_type: Some("text/html; charset=utf-8".into()), body: Bytes::from(html.into()) }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
            || self.body.starts_with(b"%PDF")
    }
}

/// Anything that can hand the pipeline a page for a URL.
///
/// Failures are reported as `None`; implementations log the reason.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Option<Page>;
}

/// HTTP fetch client with safety checks.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
    robots_cache: RobotsCache,
    rate_limiter: RateLimiter,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        let robots_cache = RobotsCache::new(config.user_agent.clone());
        let rate_limiter = RateLimiter::new(config.min_request_interval);

        Ok(Self { http, config, robots_cache, rate_limiter })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Performs a single GET: no retries. Waits on the rate limiter, checks
    /// robots.txt when enabled, and respects redirect/byte limits.
    ///
    /// # Errors
    ///
    /// `InvalidUrl`, `RobotsDisallowed`, `FetchTimeout`, `HttpError` (transport
    /// failure or non-2xx status) or `FetchTooLarge`.
    pub async fn fetch(&self, url_str: &str) -> Result<FetchResponse, Error> {
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if self.config.respect_robots {
            self.robots_cache
                .check(&self.http, &url)
                .await
                .map_err(|e| Error::RobotsDisallowed(e.to_string()))?;
        }

        self.rate_limiter.acquire().await;
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, &self.config.accept_language)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{} after {}ms", url, self.config.timeout.as_millis()))
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", status.as_u16(), url)));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{} while reading body", url))
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchResponse { url, final_url, status, content_type, bytes, fetch_ms })
    }

    /// Get reference to the robots cache.
    pub fn robots_cache(&self) -> &RobotsCache {
        &self.robots_cache
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl PageSource for FetchClient {
    async fn fetch_page(&self, url: &str) -> Option<Page> {
        match self.fetch(url).await {
            Ok(response) => Some(response.into()),
            Err(e) => {
                tracing::warn!("fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}
