//! robots.txt compliance with caching.
//!
//! Fetches and caches robots.txt files per origin, respecting a 24-hour TTL.
//! A missing robots.txt (4xx) allows everything.

use robotstxt_rs::RobotsTxt;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::{Position, Url};

/// Default TTL for robots.txt cache (24 hours).
const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum size of robots.txt to fetch (1MB).
const MAX_ROBOTS_SIZE: usize = 1024 * 1024;

/// Error type for robots.txt operations.
#[derive(Debug, thiserror::Error)]
pub enum RobotsError {
    #[error("robots.txt disallowed: {path} (robots_url: {robots_url})")]
    Disallowed { path: String, robots_url: String },

    #[error("failed to fetch robots.txt: {0}")]
    FetchError(String),

    #[error("robots.txt too large")]
    TooLarge,
}

struct CachedRobots {
    robots: RobotsTxt,
    fetched_at: Instant,
}

impl CachedRobots {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > ROBOTS_TTL
    }
}

/// In-memory cache of robots.txt rules keyed by origin.
pub struct RobotsCache {
    cache: RwLock<HashMap<String, CachedRobots>>,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(user_agent: String) -> Self {
        Self { cache: RwLock::new(HashMap::new()), user_agent }
    }

    /// Check a URL against its origin's robots.txt, fetching it with `http` on a cache miss.
    pub async fn check(&self, http: &reqwest::Client, url: &Url) -> Result<(), RobotsError> {
        let robots_url = robots_url(url);

        let cached = {
            let cache = self.cache.read().await;
            cache
                .get(&robots_url)
                .filter(|c| !c.is_expired())
                .map(|c| c.robots.can_fetch(&self.user_agent, request_target(url)))
        };

        let allowed = match cached {
            Some(allowed) => {
                tracing::debug!("robots.txt cache hit for {}: {}", robots_url, allowed);
                allowed
            }
            None => {
                let robots = self.fetch_robots(http, &robots_url).await?;
                let allowed = robots.can_fetch(&self.user_agent, request_target(url));
                let mut cache = self.cache.write().await;
                cache.insert(robots_url.clone(), CachedRobots { robots, fetched_at: Instant::now() });
                allowed
            }
        };

        if allowed { Ok(()) } else { Err(RobotsError::Disallowed { path: url.path().to_string(), robots_url }) }
    }

    async fn fetch_robots(&self, http: &reqwest::Client, url: &str) -> Result<RobotsTxt, RobotsError> {
        let response = http
            .get(url)
            .send()
            .await
            .map_err(|e| RobotsError::FetchError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            if let Some(len) = response.content_length()
                && len as usize > MAX_ROBOTS_SIZE
            {
                return Err(RobotsError::TooLarge);
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| RobotsError::FetchError(e.to_string()))?;
            if bytes.len() > MAX_ROBOTS_SIZE {
                return Err(RobotsError::TooLarge);
            }

            Ok(RobotsTxt::parse(&String::from_utf8_lossy(&bytes)))
        } else if status.is_client_error() {
            tracing::debug!("robots.txt not found for {}, allowing all", url);
            Ok(RobotsTxt::parse(""))
        } else {
            Err(RobotsError::FetchError(format!("status {}", status)))
        }
    }

    /// Drop expired entries.
    pub async fn cleanup_expired(&self) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, cached| !cached.is_expired());
    }
}

/// Path and query, which is what robots.txt rules are matched against.
fn request_target(url: &Url) -> &str {
    &url[Position::BeforePath..]
}

fn robots_url(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}/robots.txt", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}/robots.txt", url.scheme(), url.host_str().unwrap_or("")),
    }
}
