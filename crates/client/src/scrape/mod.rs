//! One scrape cycle: candidate pages to a validated snapshot.
//!
//! ```text
//! Idle -> Fetching -> LinkFound | LinkNotFound -> Extracting -> Validating -> Success | Error -> Idle
//! ```
//!
//! Candidate pages are tried in order. The first page that lists a report
//! link decides the cycle: a PDF report yields estimated figures, an HTML
//! report is fetched and extracted. When no page lists a report, or the
//! report cannot be fetched, the investor-relations page is extracted
//! directly. Sources are never merged.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::Serialize;
use url::Url;

use triwulan_core::{
    AppConfig, Error, ExtractionMethod, MetricSet, Provenance, Quarter, QuarterlySnapshot, RuleSet,
};

use crate::extract::{ReportLink, estimate, extract_document, find_report_links};
use crate::fetch::{Page, PageSource, same_site};

/// Message carried by an error snapshot when no source yielded figures.
pub const NO_DATA_MESSAGE: &str = "Unable to extract quarterly financial data";

/// Source tag of error snapshots.
pub const FAILED_SOURCE: &str = "live_scraping_failed";

/// Pipeline states, recorded in order in [`ScrapeReport::trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Fetching,
    LinkFound,
    LinkNotFound,
    Extracting,
    Validating,
    Success,
    Error,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub snapshot: QuarterlySnapshot,
    /// Report link the cycle settled on, if any.
    pub report: Option<ReportLink>,
    pub trace: Vec<CycleState>,
    /// Fetch failures, unreadable values and range rejections.
    pub warnings: Vec<String>,
}

impl ScrapeReport {
    /// Report for a cycle that failed before producing a snapshot.
    pub fn failed(message: impl Into<String>) -> Self {
        let now = Utc::now();
        let (quarter, year) = period_of(None, now);
        Self {
            snapshot: QuarterlySnapshot::error(now, quarter, year, FAILED_SOURCE, message),
            report: None,
            trace: vec![CycleState::Idle, CycleState::Error, CycleState::Idle],
            warnings: Vec::new(),
        }
    }
}

/// What a cycle found to extract from.
enum Target {
    PdfReport(ReportLink),
    HtmlReport(ReportLink, Page),
    InvestorRelations(Page),
}

/// Walks candidate pages and turns the first usable source into a snapshot.
#[derive(Debug, Clone)]
pub struct Scraper {
    candidates: Vec<String>,
    investor_relations_url: String,
    rules: RuleSet,
    estimate_fallback: bool,
}

impl Scraper {
    pub fn new(candidates: Vec<String>, investor_relations_url: impl Into<String>, rules: RuleSet) -> Self {
        Self { candidates, investor_relations_url: investor_relations_url.into(), rules, estimate_fallback: true }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.candidate_urls(), config.investor_relations_url(), config.rule_set())
            .with_estimate_fallback(config.estimate_fallback)
    }

    /// Whether a PDF-only cycle yields estimated figures (default) or an error.
    pub fn with_estimate_fallback(mut self, enabled: bool) -> Self {
        self.estimate_fallback = enabled;
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run one cycle against `source`.
    ///
    /// Fetch and extraction failures end in an error snapshot inside the report.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when no candidate page is configured.
    pub async fn run(&self, source: &dyn PageSource) -> Result<ScrapeReport, Error> {
        if self.candidates.is_empty() {
            return Err(Error::InvalidInput("no candidate pages configured".into()));
        }

        let mut cycle = Cycle::new();
        cycle.enter(CycleState::Fetching);

        let target = match self.find_report(source, &mut cycle).await {
            Some((link, page)) => {
                cycle.enter(CycleState::LinkFound);
                self.resolve_report(source, &mut cycle, link, &page).await
            }
            None => {
                cycle.enter(CycleState::LinkNotFound);
                None
            }
        };

        let target = match target {
            Some(target) => Some(target),
            None => self.fetch_investor_relations(source, &mut cycle).await,
        };

        let Some(target) = target else {
            return Ok(cycle.fail(None, NO_DATA_MESSAGE));
        };

        cycle.enter(CycleState::Extracting);
        let (quarter, year) = period_of(cycle.report.as_ref(), cycle.started);
        let (provenance, readings) = match self.extract(target, quarter, &mut cycle) {
            Ok(extracted) => extracted,
            Err(message) => return Ok(cycle.fail(Some((quarter, year)), &message)),
        };

        cycle.enter(CycleState::Validating);
        let validated = self.rules.validate(readings);
        cycle.warnings.extend(validated.rejected.iter().map(|r| format!("rejected {r}")));

        match QuarterlySnapshot::success(cycle.started, quarter, year, provenance.clone(), validated) {
            Ok(snapshot) => {
                tracing::info!(
                    quarter = %quarter,
                    year,
                    source = %provenance.source_tag(),
                    metrics = snapshot.metrics().map_or(0, |m| m.len()),
                    estimated = provenance.is_estimated(),
                    "scrape cycle succeeded"
                );
                Ok(cycle.finish(snapshot, CycleState::Success))
            }
            Err(e) => Ok(cycle.fail(Some((quarter, year)), &e.to_string())),
        }
    }

    /// First candidate page that lists a report link, with that page.
    async fn find_report(&self, source: &dyn PageSource, cycle: &mut Cycle) -> Option<(ReportLink, Page)> {
        for url in &self.candidates {
            let Some(page) = source.fetch_page(url).await else {
                cycle.warn(format!("could not fetch {url}"));
                continue;
            };

            let links = find_report_links(&page.text(), &page.url);
            tracing::debug!("{} report link(s) on {}", links.len(), page.url);
            if let Some(link) = links.into_iter().next() {
                return Some((link, page));
            }
        }

        None
    }

    /// Turn the chosen report link into an extraction target.
    async fn resolve_report(
        &self, source: &dyn PageSource, cycle: &mut Cycle, link: ReportLink, listing: &Page,
    ) -> Option<Target> {
        cycle.report = Some(link.clone());

        if link.is_pdf() {
            return Some(Target::PdfReport(link));
        }

        let off_site = Url::parse(&link.href).map_or(true, |href| !same_site(&href, &listing.url));
        if off_site {
            cycle.warn(format!("report link {} is off-site, not followed", link.href));
            return None;
        }

        match source.fetch_page(&link.href).await {
            Some(page) if page.is_pdf() => Some(Target::PdfReport(link)),
            Some(page) => Some(Target::HtmlReport(link, page)),
            None => {
                cycle.warn(format!("could not fetch report {}", link.href));
                None
            }
        }
    }

    async fn fetch_investor_relations(&self, source: &dyn PageSource, cycle: &mut Cycle) -> Option<Target> {
        tracing::debug!("falling back to {}", self.investor_relations_url);
        match source.fetch_page(&self.investor_relations_url).await {
            Some(page) => Some(Target::InvestorRelations(page)),
            None => {
                cycle.warn(format!("could not fetch {}", self.investor_relations_url));
                None
            }
        }
    }

    fn extract(&self, target: Target, quarter: Quarter, cycle: &mut Cycle) -> Result<(Provenance, MetricSet), String> {
        let (page, method) = match target {
            Target::PdfReport(link) => {
                if !self.estimate_fallback {
                    return Err(format!("report {} is a PDF and estimation is disabled", link.href));
                }
                cycle.warn(format!("report {} is a PDF; figures are estimated", link.href));
                let readings = estimate(quarter, &mut rand::thread_rng());
                return Ok((Provenance::Estimated { report_url: Some(link.href) }, readings));
            }
            Target::HtmlReport(_, page) => (page, ExtractionMethod::ReportHtml),
            Target::InvestorRelations(page) => (page, ExtractionMethod::Highlights),
        };

        let extraction = extract_document(&page.text());
        if extraction.is_empty() {
            return Err(NO_DATA_MESSAGE.to_string());
        }

        let (readings, unreadable) = extraction.readings();
        cycle.warnings.extend(unreadable.iter().map(|m| format!("no number in extracted {m}")));

        Ok((Provenance::Extracted { url: page.url.to_string(), method }, readings))
    }
}

/// Quarter and year of the snapshot: from the report URL when it names them, else the clock.
fn period_of(report: Option<&ReportLink>, now: DateTime<Utc>) -> (Quarter, i32) {
    match report {
        Some(link) if !link.inferred => (link.quarter, link.year),
        _ => {
            let local = now.with_timezone(&Local);
            (Quarter::of(&local), local.year())
        }
    }
}

/// Mutable state of a cycle in flight.
struct Cycle {
    started: DateTime<Utc>,
    trace: Vec<CycleState>,
    warnings: Vec<String>,
    report: Option<ReportLink>,
}

impl Cycle {
    fn new() -> Self {
        Self { started: Utc::now(), trace: vec![CycleState::Idle], warnings: Vec::new(), report: None }
    }

    fn enter(&mut self, state: CycleState) {
        tracing::debug!(state = ?state, "scrape cycle transition");
        self.trace.push(state);
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    fn fail(self, period: Option<(Quarter, i32)>, message: &str) -> ScrapeReport {
        let (quarter, year) = period.unwrap_or_else(|| period_of(None, self.started));
        tracing::warn!(quarter = %quarter, year, "scrape cycle failed: {}", message);
        let snapshot = QuarterlySnapshot::error(self.started, quarter, year, FAILED_SOURCE, message);
        self.finish(snapshot, CycleState::Error)
    }

    fn finish(mut self, snapshot: QuarterlySnapshot, terminal: CycleState) -> ScrapeReport {
        self.enter(terminal);
        self.enter(CycleState::Idle);
        ScrapeReport { snapshot, report: self.report, trace: self.trace, warnings: self.warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use triwulan_core::{Confidence, Metric, Status};

    /// Serves canned HTML by URL; anything else is a fetch failure.
    #[derive(Default)]
    struct Fixture {
        pages: HashMap<String, Page>,
    }

    impl Fixture {
        fn html(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), Page::html(Url::parse(url).unwrap(), html));
            self
        }

        fn pdf(mut self, url: &str) -> Self {
            let page = Page {
                url: Url::parse(url).unwrap(),
                content_type: Some("application/pdf".into()),
                body: bytes::Bytes::from_static(b"%PDF-1.7"),
            };
            self.pages.insert(url.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl PageSource for Fixture {
        async fn fetch_page(&self, url: &str) -> Option<Page> {
            self.pages.get(url).cloned()
        }
    }

    const QUARTERLY: &str = "https://bank.test/laporan-triwulanan";
    const FINANCIAL: &str = "https://bank.test/laporan-keuangan";
    const IR: &str = "https://bank.test/hubungan-investor";

    fn scraper() -> Scraper {
        Scraper::new(vec![QUARTERLY.into(), FINANCIAL.into(), IR.into()], IR, RuleSet::default())
    }

    #[tokio::test]
    async fn test_html_report_is_extracted() {
        let source = Fixture::default()
            .html(QUARTERLY, r#"<a href="/files/laporan-triwulan-q3-2024-pdf.html">Laporan Triwulan III</a>"#)
            .html(
                "https://bank.test/files/laporan-triwulan-q3-2024-pdf.html",
                "<table><tr><td>Total Aset</td><td>Rp 60,1 Triliun</td></tr></table>",
            );

        let report = scraper().run(&source).await.unwrap();
        let snapshot = &report.snapshot;

        assert_eq!(snapshot.status(), Status::Success);
        assert_eq!(snapshot.value(Metric::TotalAssets), Some(60.1));
        assert_eq!((snapshot.quarter(), snapshot.year()), (Quarter::Q3, 2024));
        assert!(!snapshot.is_estimated());
        assert_eq!(
            report.trace,
            vec![
                CycleState::Idle,
                CycleState::Fetching,
                CycleState::LinkFound,
                CycleState::Extracting,
                CycleState::Validating,
                CycleState::Success,
                CycleState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_metric_is_dropped() {
        let source = Fixture::default().html(
            IR,
            "<table>
                <tr><td>CAR</td><td>5.5%</td></tr>
                <tr><td>ROA</td><td>0,45%</td></tr>
            </table>",
        );

        let report = scraper().run(&source).await.unwrap();
        let snapshot = &report.snapshot;

        assert!(snapshot.is_success());
        assert_eq!(snapshot.value(Metric::Car), None);
        assert_eq!(snapshot.value(Metric::Roa), Some(0.45));
        assert_eq!(snapshot.rejected().len(), 1);
        assert!(report.warnings.iter().any(|w| w.contains("car: 5.5")));
        assert!(report.trace.contains(&CycleState::LinkNotFound));
    }

    #[tokio::test]
    async fn test_every_source_failing_is_an_error_snapshot() {
        let report = scraper().run(&Fixture::default()).await.unwrap();
        let snapshot = &report.snapshot;

        assert_eq!(snapshot.status(), Status::Error);
        assert!(snapshot.metrics().is_none());
        assert_eq!(snapshot.error_message(), Some(NO_DATA_MESSAGE));
        assert_eq!(report.warnings.len(), 4);
        assert_eq!(report.trace.last(), Some(&CycleState::Idle));
        assert!(report.trace.contains(&CycleState::Error));
    }

    #[tokio::test]
    async fn test_pdf_report_is_estimated() {
        let source = Fixture::default()
            .html(QUARTERLY, r#"<a href="/files/laporan-triwulan-2024-q2.pdf">Laporan Triwulan II 2024</a>"#);

        let report = scraper().run(&source).await.unwrap();
        let snapshot = &report.snapshot;

        assert!(snapshot.is_success());
        assert!(snapshot.is_estimated());
        assert_eq!(snapshot.quarter(), Quarter::Q2);
        assert_eq!(snapshot.metrics().map(|m| m.len()), Some(Metric::ALL.len()));
        assert!(
            snapshot
                .metrics()
                .is_some_and(|m| m.values().all(|r| r.confidence == Confidence::Estimated))
        );
        assert_eq!(
            snapshot.provenance(),
            Some(&Provenance::Estimated { report_url: Some("https://bank.test/files/laporan-triwulan-2024-q2.pdf".into()) })
        );
    }

    #[tokio::test]
    async fn test_pdf_report_without_estimation_is_error() {
        let source = Fixture::default().html(QUARTERLY, r#"<a href="/files/q1-2024.pdf">Laporan Q1</a>"#);

        let report = scraper().with_estimate_fallback(false).run(&source).await.unwrap();
        assert_eq!(report.snapshot.status(), Status::Error);
        assert!(report.snapshot.error_message().is_some_and(|m| m.contains("estimation is disabled")));
    }

    #[tokio::test]
    async fn test_report_served_as_pdf_is_estimated() {
        let source = Fixture::default()
            .html(FINANCIAL, r#"<a href="/download?file=pdf&id=9">Laporan Keuangan Interim</a>"#)
            .pdf("https://bank.test/download?file=pdf&id=9");

        let report = scraper().run(&source).await.unwrap();
        assert!(report.snapshot.is_estimated());
        assert_eq!(report.warnings.first().map(String::as_str), Some("could not fetch https://bank.test/laporan-triwulanan"));
    }

    #[tokio::test]
    async fn test_unreachable_report_falls_back_to_investor_relations() {
        let source = Fixture::default()
            .html(QUARTERLY, r#"<a href="/files/triwulan-pdf-viewer">Laporan Triwulan</a>"#)
            .html(IR, r#"<div data-metric="bopo">98,5%</div>"#);

        let report = scraper().run(&source).await.unwrap();
        let snapshot = &report.snapshot;

        assert_eq!(snapshot.value(Metric::Bopo), Some(98.5));
        assert_eq!(
            snapshot.provenance(),
            Some(&Provenance::Extracted { url: IR.into(), method: ExtractionMethod::Highlights })
        );
        assert!(report.warnings.iter().any(|w| w.starts_with("could not fetch report")));
    }

    #[tokio::test]
    async fn test_off_site_report_is_not_followed() {
        let source = Fixture::default()
            .html(QUARTERLY, r#"<a href="https://elsewhere.test/triwulan-pdf.html">Laporan Triwulan</a>"#)
            .html("https://elsewhere.test/triwulan-pdf.html", "<table><tr><td>ROA</td><td>9%</td></tr></table>")
            .html(IR, "<table><tr><td>ROA</td><td>0,45%</td></tr></table>");

        let report = scraper().run(&source).await.unwrap();
        assert_eq!(report.snapshot.value(Metric::Roa), Some(0.45));
        assert!(report.warnings.iter().any(|w| w.contains("off-site")));
    }

    #[tokio::test]
    async fn test_all_values_rejected_is_error() {
        let source = Fixture::default().html(IR, "<table><tr><td>CAR</td><td>75%</td></tr></table>");

        let report = scraper().run(&source).await.unwrap();
        assert_eq!(report.snapshot.status(), Status::Error);
        assert!(report.warnings.iter().any(|w| w.contains("car: 75")));
    }

    #[tokio::test]
    async fn test_no_candidates_is_invalid_input() {
        let scraper = Scraper::new(Vec::new(), IR, RuleSet::default());
        assert!(matches!(scraper.run(&Fixture::default()).await, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_failed_report_uses_local_period() {
        let report = ScrapeReport::failed("Scraping exception: boom");
        let snapshot = &report.snapshot;

        let expected = period_of(None, snapshot.timestamp());
        assert_eq!((snapshot.quarter(), snapshot.year()), expected);
        assert_eq!(snapshot.status(), Status::Error);
    }
}
