//! Client code for triwulan.
//!
//! This crate provides the HTTP fetch pipeline, report discovery, metric
//! extraction and normalization, the scrape cycle, and the monitor that owns
//! history and counters. It is shared by the server and CLI.

pub mod extract;
pub mod fetch;
pub mod monitor;
pub mod scrape;

pub use extract::{
    Extraction, Link, NumberLocale, Probe, RawMetrics, ReportLink, estimate, extract_document, extract_links,
    find_report_links, normalize, parse_amount,
};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Page, PageSource};
pub use monitor::{AutoRefresh, Monitor, ScrapeStats};
pub use scrape::{CycleState, ScrapeReport, Scraper};
