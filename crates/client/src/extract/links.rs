//! Link harvesting and quarterly report discovery from HTML documents.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use triwulan_core::Quarter;

use crate::fetch::resolve_href;

/// Year assumed when a report URL carries none.
pub const DEFAULT_REPORT_YEAR: i32 = 2024;

/// Quarter assumed when a report URL carries none.
pub const DEFAULT_REPORT_QUARTER: Quarter = Quarter::Q4;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector 'a[href]' is valid"));

static REPORT_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)triwulan|quarterly|q[1-4]|laporan.*triwulan",
        r"(?i)financial.*statement|laporan.*keuangan",
        r"(?i)interim.*report|laporan.*interim",
    ]
    .map(|p| Regex::new(p).expect("hardcoded report pattern is valid"))
});

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"20\d{2}").expect("hardcoded year pattern is valid"));

static QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[qQ]([1-4])|triwulan[- _]([1-4])").expect("hardcoded quarter pattern is valid")
});

/// A harvested link with text and href.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Link {
    /// Link text content
    pub text: String,
    /// Resolved href URL
    pub href: String,
    /// The href attribute as written in the page
    pub raw_href: String,
}

/// A candidate quarterly report found on an investor-relations page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLink {
    /// Absolute URL of the report
    pub href: String,
    /// Visible anchor text
    pub text: String,
    pub year: i32,
    pub quarter: Quarter,
    /// True when year or quarter fell back to a default.
    pub inferred: bool,
}

impl ReportLink {
    /// Build a report link, reading year and quarter from the URL path and query.
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        let href = href.into();
        let haystack = match Url::parse(&href) {
            Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or("")),
            Err(_) => href.clone(),
        };
        let year = YEAR.find(&haystack).and_then(|m| m.as_str().parse::<i32>().ok());
        let quarter = QUARTER
            .captures(&haystack)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .and_then(Quarter::from_number);

        Self {
            inferred: year.is_none() || quarter.is_none(),
            year: year.unwrap_or(DEFAULT_REPORT_YEAR),
            quarter: quarter.unwrap_or(DEFAULT_REPORT_QUARTER),
            text: text.into(),
            href,
        }
    }

    /// `year * 10 + quarter`, larger is more recent.
    pub fn sort_key(&self) -> i64 {
        i64::from(self.year) * 10 + i64::from(self.quarter.number())
    }

    /// Whether the URL path names a PDF file.
    pub fn is_pdf(&self) -> bool {
        Url::parse(&self.href)
            .map(|u| u.path().to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or_else(|_| self.href.to_ascii_lowercase().ends_with(".pdf"))
    }
}

/// Extract links from an HTML document, resolving relative URLs against the base URL.
///
/// This extracts all `<a>` tags with href attributes, resolves relative URLs,
/// drops non-http targets, and removes duplicates (by href).
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Link> {
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let resolved = match resolve_href(base_url, href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                tracing::trace!("skipping href {:?}: {}", href, e);
                continue;
            }
        };

        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        links.push(Link { text, href: resolved, raw_href: href.to_string() });
    }

    links
}

/// Find quarterly report links, most recent first.
///
/// An anchor qualifies when its text plus href attribute matches one of the
/// report keyword patterns and the href points at a PDF. The attribute is
/// matched as written, so the listing page's own path never qualifies a
/// relative link. Links whose year and quarter tie keep document order.
pub fn find_report_links(html: &str, base_url: &Url) -> Vec<ReportLink> {
    let mut reports: Vec<ReportLink> = extract_links(html, base_url)
        .into_iter()
        .filter(|link| {
            let href = link.raw_href.to_lowercase();
            let haystack = format!("{} {}", link.text.to_lowercase(), href);
            (href.ends_with(".pdf") || href.contains("pdf")) && REPORT_PATTERNS.iter().any(|p| p.is_match(&haystack))
        })
        .map(|link| {
            tracing::debug!("found report link: {} ({})", link.text, link.href);
            ReportLink::new(link.href, link.text)
        })
        .collect();

    reports.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    reports
}
