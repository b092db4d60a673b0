//! Session owner: runs scrape cycles and keeps their history and counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use triwulan_core::{AppConfig, Error, History, QuarterlySnapshot};

use crate::fetch::{FetchClient, FetchConfig, PageSource};
use crate::scrape::{ScrapeReport, Scraper};

/// Cycle counters since start or the last [`Monitor::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeStats {
    pub total_scrapes: u64,
    pub successes: u64,
    pub error_count: u64,
}

impl ScrapeStats {
    /// Fraction of cycles that succeeded, 0.0 before the first cycle.
    pub fn success_rate(&self) -> f64 {
        if self.total_scrapes == 0 { 0.0 } else { self.successes as f64 / self.total_scrapes as f64 }
    }

    fn record(&mut self, snapshot: &QuarterlySnapshot) {
        self.total_scrapes += 1;
        if snapshot.is_success() {
            self.successes += 1;
        } else {
            self.error_count += 1;
        }
    }
}

/// Periodic re-scrape setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoRefresh {
    pub enabled: bool,
    pub interval: Duration,
}

impl AutoRefresh {
    pub fn every(interval: Duration) -> Self {
        Self { enabled: true, interval }
    }

    pub fn disabled(interval: Duration) -> Self {
        Self { enabled: false, interval }
    }

    /// Whether a cycle is due at `now` given the last cycle time.
    ///
    /// Always due when enabled and nothing has run yet. A `last` in the future is never due.
    pub fn is_due(&self, now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> bool {
        if !self.enabled {
            return false;
        }
        match last {
            None => true,
            Some(last) => (now - last).to_std().is_ok_and(|elapsed| elapsed >= self.interval),
        }
    }
}

/// Owns the scraper, its page source, the snapshot history and the counters.
pub struct Monitor {
    scraper: Scraper,
    source: Arc<dyn PageSource>,
    history: History,
    stats: ScrapeStats,
    auto_refresh: AutoRefresh,
    last_scrape_at: Option<DateTime<Utc>>,
}

impl Monitor {
    pub fn new(scraper: Scraper, source: Arc<dyn PageSource>, history: History, auto_refresh: AutoRefresh) -> Self {
        Self { scraper, source, history, stats: ScrapeStats::default(), auto_refresh, last_scrape_at: None }
    }

    /// Monitor fetching over HTTP with every setting taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = FetchClient::new(FetchConfig::from(config))?;
        Ok(Self::new(
            Scraper::from_config(config),
            Arc::new(client),
            History::with_capacity(config.history_capacity),
            AutoRefresh::every(config.auto_refresh_interval()),
        ))
    }

    /// Run one cycle. Never fails: any error becomes an error snapshot.
    ///
    /// Successful snapshots are appended to the history; failures only count.
    pub async fn run_cycle(&mut self) -> ScrapeReport {
        let report = match self.scraper.run(self.source.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("scrape cycle aborted: {}", e);
                ScrapeReport::failed(format!("Scraping exception: {e}"))
            }
        };

        self.stats.record(&report.snapshot);
        self.last_scrape_at = Some(report.snapshot.timestamp());
        if report.snapshot.is_success()
            && let Some(evicted) = self.history.append(report.snapshot.clone())
        {
            tracing::debug!("history full, evicted snapshot from {}", evicted.timestamp());
        }

        report
    }

    /// Run a cycle if auto-refresh says one is due at `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Option<ScrapeReport> {
        if self.auto_refresh.is_due(now, self.last_scrape_at) {
            Some(self.run_cycle().await)
        } else {
            None
        }
    }

    /// Forget all snapshots, counters and the last scrape time.
    pub fn clear(&mut self) {
        self.history.clear();
        self.stats = ScrapeStats::default();
        self.last_scrape_at = None;
        tracing::info!("monitor state cleared");
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> ScrapeStats {
        self.stats
    }

    pub fn last_scrape_at(&self) -> Option<DateTime<Utc>> {
        self.last_scrape_at
    }

    pub fn auto_refresh(&self) -> AutoRefresh {
        self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, auto_refresh: AutoRefresh) {
        self.auto_refresh = auto_refresh;
    }

    pub fn scraper(&self) -> &Scraper {
        &self.scraper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Page;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use triwulan_core::{Metric, RuleSet};
    use url::Url;

    const IR: &str = "https://bank.test/hubungan-investor";

    /// Serves the investor-relations page for the first `ok` requests, then fails.
    struct Flaky {
        ok: usize,
        served: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for Flaky {
        async fn fetch_page(&self, url: &str) -> Option<Page> {
            if self.served.fetch_add(1, Ordering::SeqCst) >= self.ok {
                return None;
            }
            let html = "<table><tr><td>Total Aset</td><td>Rp 60,1 Triliun</td></tr></table>";
            Some(Page::html(Url::parse(url).ok()?, html))
        }
    }

    fn monitor(ok: usize, capacity: usize) -> Monitor {
        let scraper = Scraper::new(vec![IR.into()], IR, RuleSet::default());
        let source = Arc::new(Flaky { ok, served: AtomicUsize::new(0) });
        Monitor::new(scraper, source, History::with_capacity(capacity), AutoRefresh::every(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_success_is_appended() {
        let mut monitor = monitor(usize::MAX, 10);
        let report = monitor.run_cycle().await;

        assert!(report.snapshot.is_success());
        assert_eq!(monitor.history().len(), 1);
        assert_eq!(monitor.history().latest().and_then(|s| s.value(Metric::TotalAssets)), Some(60.1));
        assert_eq!(monitor.stats(), ScrapeStats { total_scrapes: 1, successes: 1, error_count: 0 });
        assert!(monitor.last_scrape_at().is_some());
    }

    #[tokio::test]
    async fn test_failure_counts_but_is_not_stored() {
        let mut monitor = monitor(0, 10);
        let report = monitor.run_cycle().await;

        assert!(!report.snapshot.is_success());
        assert!(monitor.history().is_empty());
        assert_eq!(monitor.stats().error_count, 1);
        assert_eq!(monitor.stats().success_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let mut monitor = monitor(usize::MAX, 3);
        for _ in 0..5 {
            monitor.run_cycle().await;
        }
        assert_eq!(monitor.history().len(), 3);
        assert_eq!(monitor.stats().total_scrapes, 5);
    }

    #[tokio::test]
    async fn test_aborted_cycle_becomes_error_snapshot() {
        let scraper = Scraper::new(Vec::new(), IR, RuleSet::default());
        let source = Arc::new(Flaky { ok: usize::MAX, served: AtomicUsize::new(0) });
        let mut monitor = Monitor::new(scraper, source, History::with_capacity(5), AutoRefresh::disabled(Duration::ZERO));

        let report = monitor.run_cycle().await;
        assert!(report.snapshot.error_message().is_some_and(|m| m.starts_with("Scraping exception")));
        assert_eq!(monitor.stats().error_count, 1);
    }

    #[tokio::test]
    async fn test_tick_respects_interval() {
        let mut monitor = monitor(usize::MAX, 10);
        let start = Utc::now();

        assert!(monitor.tick(start).await.is_some());
        let last = monitor.last_scrape_at().unwrap();
        assert!(monitor.tick(last + TimeDelta::seconds(30)).await.is_none());
        assert!(monitor.tick(last + TimeDelta::seconds(61)).await.is_some());
        assert_eq!(monitor.stats().total_scrapes, 2);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let mut monitor = monitor(1, 10);
        monitor.run_cycle().await;
        monitor.run_cycle().await;
        monitor.clear();

        assert!(monitor.history().is_empty());
        assert_eq!(monitor.stats(), ScrapeStats::default());
        assert!(monitor.last_scrape_at().is_none());
    }

    #[test]
    fn test_auto_refresh_is_due() {
        let now = Utc::now();
        let refresh = AutoRefresh::every(Duration::from_secs(240 * 60));

        assert!(refresh.is_due(now, None));
        assert!(!refresh.is_due(now, Some(now - TimeDelta::minutes(239))));
        assert!(refresh.is_due(now, Some(now - TimeDelta::minutes(240))));
        assert!(!refresh.is_due(now, Some(now + TimeDelta::minutes(5))));
        assert!(!AutoRefresh::disabled(Duration::ZERO).is_due(now, None));
    }

    #[test]
    fn test_success_rate() {
        let stats = ScrapeStats { total_scrapes: 4, successes: 3, error_count: 1 };
        assert_eq!(stats.success_rate(), 0.75);
    }
}
