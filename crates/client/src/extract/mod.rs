//! Financial figure extraction from investor-relations pages.
//!
//! ### Link Discovery
//! - Harvests anchors, keeps PDF links whose text or href names a quarterly,
//!   financial or interim report, and orders them most recent first.
//!
//! ### Metric Extraction
//! - Highlight selectors, then tables, then free text; first hit per metric wins.
//! - The page's declared language becomes the number locale hint.
//!
//! ### Normalization
//! - Indonesian and English number formats, currency and scale words.
//!
//! ### Estimation
//! - Seasonal estimates for cycles that only located a PDF report.

pub mod estimate;
pub mod links;
pub mod metrics;
pub mod normalize;

pub use estimate::estimate;
pub use links::{Link, ReportLink, extract_links, find_report_links};
pub use metrics::{Extraction, Probe, RawMetrics, extract_document, extract_highlights, extract_table, extract_text};
pub use normalize::{NumberLocale, Normalized, Scale, normalize, parse_amount, to_reading};
