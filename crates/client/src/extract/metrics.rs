//! Metric extraction from report pages.
//!
//! Three probes run over a document, in order:
//! 1. highlight widgets found by CSS selector (`.total-assets`, `[data-metric="car"]`, ...)
//! 2. every `<table>`, reading label/value rows
//! 3. the body text, only when the first two found nothing
//!
//! The first hit per metric wins; later duplicates are ignored.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use triwulan_core::{Metric, MetricSet};

use super::normalize::{NumberLocale, to_reading};

/// Raw text fragments keyed by the metric they were labelled with.
pub type RawMetrics = BTreeMap<Metric, String>;

/// How many characters after a label are searched for its value in free text.
const TEXT_WINDOW: usize = 60;

/// Label rule: `any` must match, `all` (if set) must match, `none` (if set) must not.
struct LabelRule {
    metric: Metric,
    any: Regex,
    all: Option<Regex>,
    none: Option<Regex>,
}

impl LabelRule {
    fn new(metric: Metric, any: &str) -> Self {
        Self { metric, any: compile(any), all: None, none: None }
    }

    fn requiring(mut self, pattern: &str) -> Self {
        self.all = Some(compile(pattern));
        self
    }

    fn excluding(mut self, pattern: &str) -> Self {
        self.none = Some(compile(pattern));
        self
    }

    fn matches(&self, label: &str) -> bool {
        self.any.is_match(label)
            && self.all.as_ref().is_none_or(|r| r.is_match(label))
            && self.none.as_ref().is_none_or(|r| !r.is_match(label))
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("hardcoded label pattern is valid")
}

static TABLE_LABELS: LazyLock<Vec<LabelRule>> = LazyLock::new(|| {
    vec![
        LabelRule::new(Metric::TotalAssets, "total aset|total asset"),
        LabelRule::new(Metric::NpfGross, "npf").requiring("bruto|gross"),
        LabelRule::new(Metric::Car, "car|rasio kecukupan modal|kpmm|kewajiban penyediaan modal minimum"),
        LabelRule::new(Metric::Bopo, "bopo"),
        LabelRule::new(Metric::Roa, "roa"),
        LabelRule::new(Metric::Roe, "roe"),
        LabelRule::new(Metric::Nim, r"\bnim\b|net interest margin|margin bagi hasil"),
        LabelRule::new(Metric::TotalDph, r"dana pihak ketiga|\bdpk\b"),
        LabelRule::new(Metric::TotalFinancing, "pembiayaan|financing").excluding("npf|bermasalah|rasio|ratio|margin"),
    ]
});

static TEXT_LABELS: LazyLock<Vec<LabelRule>> = LazyLock::new(|| {
    vec![
        LabelRule::new(Metric::TotalAssets, "total aset|total asset"),
        LabelRule::new(Metric::NpfGross, r"npf\s*\(?\s*(?:bruto|gross)|(?:bruto|gross)\s+npf"),
        LabelRule::new(Metric::Car, r"\bcar\b|rasio kecukupan modal|\bkpmm\b"),
        LabelRule::new(Metric::Bopo, r"\bbopo\b"),
        LabelRule::new(Metric::Roa, r"\broa\b"),
        LabelRule::new(Metric::Roe, r"\broe\b"),
        LabelRule::new(Metric::Nim, r"\bnim\b|net interest margin|margin bagi hasil"),
        LabelRule::new(Metric::TotalDph, r"dana pihak ketiga|\bdpk\b"),
        LabelRule::new(Metric::TotalFinancing, "total pembiayaan|total financing"),
    ]
});

static VALUE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?:rp\.?\s*)?-?\d(?:[\d.,]*\d)?\s*(?:%|triliun|trillion|miliar|billion|juta|million)?")
});

static HAS_DIGIT: LazyLock<Regex> = LazyLock::new(|| compile(r"\d"));

/// Highlight selectors per metric, most specific first.
const HIGHLIGHT_SELECTORS: &[(Metric, &[&str])] = &[
    (Metric::TotalAssets, &[".total-assets", ".total-asset", "[data-metric=\"assets\"]"]),
    (Metric::NpfGross, &[".npf-gross", ".npf", "[data-metric=\"npf\"]"]),
    (Metric::Car, &[".car-ratio", ".capital-adequacy", "[data-metric=\"car\"]"]),
    (Metric::Bopo, &[".bopo-ratio", ".efficiency", "[data-metric=\"bopo\"]"]),
    (Metric::Roa, &[".roa", ".return-assets", "[data-metric=\"roa\"]"]),
    (Metric::Roe, &[".roe", ".return-equity", "[data-metric=\"roe\"]"]),
    (Metric::Nim, &[".nim", "[data-metric=\"nim\"]"]),
    (Metric::TotalDph, &[".dpk", ".third-party-funds", "[data-metric=\"dpk\"]"]),
    (Metric::TotalFinancing, &[".total-financing", "[data-metric=\"financing\"]"]),
];

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static HTML_LANG: LazyLock<Selector> = LazyLock::new(|| selector("html[lang]"));
static META_LANG: LazyLock<Selector> = LazyLock::new(|| selector("meta[http-equiv][content]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("hardcoded selector is valid")
}

/// Which probe produced the raw values of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Probe {
    Highlights,
    Tables,
    Text,
}

/// Raw values pulled from one document, with the number locale the page declares.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub raw: RawMetrics,
    pub locale: NumberLocale,
    /// Probes that contributed at least one value, in order.
    pub probes: Vec<Probe>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Normalize every raw fragment. Fragments without a readable number are returned separately.
    pub fn readings(&self) -> (MetricSet, Vec<Metric>) {
        let mut readings = MetricSet::new();
        let mut unreadable = Vec::new();

        for (&metric, raw) in &self.raw {
            match to_reading(metric, raw, self.locale) {
                Some(reading) => {
                    readings.insert(metric, reading);
                }
                None => {
                    tracing::warn!(metric = %metric, raw = %raw, "no number in extracted value");
                    unreadable.push(metric);
                }
            }
        }

        (readings, unreadable)
    }
}

/// Read label/value rows from a table.
///
/// Rows with fewer than two cells, or whose second cell has no digit, are skipped.
pub fn extract_table(table: ElementRef<'_>) -> RawMetrics {
    let mut raw = RawMetrics::new();

    for row in table.select(&ROW) {
        let mut cells = row.select(&CELL);
        let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
            continue;
        };

        let label = collapse(label).to_lowercase();
        let value = collapse(value);
        if !HAS_DIGIT.is_match(&value) {
            continue;
        }

        if let Some(rule) = TABLE_LABELS.iter().find(|r| r.matches(&label)) {
            raw.entry(rule.metric).or_insert(value);
        }
    }

    raw
}

/// Find `label ... value` pairs in free text.
pub fn extract_text(text: &str) -> RawMetrics {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut raw = RawMetrics::new();

    for rule in TEXT_LABELS.iter() {
        for label in rule.any.find_iter(&text) {
            let rest = &text[label.end()..];
            let window_end = rest.char_indices().nth(TEXT_WINDOW).map_or(rest.len(), |(i, _)| i);
            if let Some(value) = VALUE.find(&rest[..window_end]) {
                raw.entry(rule.metric).or_insert_with(|| value.as_str().trim().to_string());
                break;
            }
        }
    }

    raw
}

/// Probe the highlight widgets of an investor-relations page.
pub fn extract_highlights(document: &Html) -> RawMetrics {
    let mut raw = RawMetrics::new();

    for (metric, selectors) in HIGHLIGHT_SELECTORS {
        let found = selectors
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .find_map(|sel| document.select(&sel).map(collapse).find(|text| HAS_DIGIT.is_match(text)));
        if let Some(text) = found {
            raw.insert(*metric, text);
        }
    }

    raw
}

/// Run every probe over an HTML document.
pub fn extract_document(html: &str) -> Extraction {
    let document = Html::parse_document(html);
    let mut extraction = Extraction { locale: detect_locale(&document), ..Extraction::default() };

    let highlights = extract_highlights(&document);
    if !highlights.is_empty() {
        extraction.probes.push(Probe::Highlights);
        extraction.raw = highlights;
    }

    let mut from_tables = false;
    for table in document.select(&TABLE) {
        for (metric, value) in extract_table(table) {
            if let std::collections::btree_map::Entry::Vacant(slot) = extraction.raw.entry(metric) {
                slot.insert(value);
                from_tables = true;
            }
        }
    }
    if from_tables {
        extraction.probes.push(Probe::Tables);
    }

    if extraction.raw.is_empty()
        && let Some(body) = document.select(&BODY).next()
    {
        extraction.raw = extract_text(&body.text().collect::<Vec<_>>().join(" "));
        if !extraction.raw.is_empty() {
            extraction.probes.push(Probe::Text);
        }
    }

    tracing::debug!(found = extraction.raw.len(), probes = ?extraction.probes, locale = ?extraction.locale, "extracted document");
    extraction
}

/// Number locale declared by `<html lang>` or a `Content-Language` meta tag.
pub fn detect_locale(document: &Html) -> NumberLocale {
    if let Some(lang) = document.select(&HTML_LANG).next().and_then(|el| el.value().attr("lang")) {
        return NumberLocale::from_lang(lang);
    }

    document
        .select(&META_LANG)
        .find(|el| el.value().attr("http-equiv").is_some_and(|v| v.eq_ignore_ascii_case("content-language")))
        .and_then(|el| el.value().attr("content"))
        .map_or(NumberLocale::Unknown, NumberLocale::from_lang)
}

fn collapse(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_table(html: &str) -> RawMetrics {
        let document = Html::parse_document(html);
        let table = document.select(&TABLE).next().unwrap();
        extract_table(table)
    }

    #[test]
    fn test_extract_table_labels() {
        let raw = first_table(
            r#"<table>
                <tr><th>Indikator</th><th>Q3 2024</th></tr>
                <tr><td>Total Aset</td><td>Rp 60,1 Triliun</td></tr>
                <tr><td>NPF Bruto</td><td>3,99%</td></tr>
                <tr><td>NPF Neto</td><td>2,10%</td></tr>
                <tr><td>Rasio Kecukupan Modal (CAR)</td><td>29,40%</td></tr>
                <tr><td>BOPO</td><td>98,5%</td></tr>
                <tr><td>ROA</td><td>0,45%</td></tr>
                <tr><td>ROE</td><td>4,20%</td></tr>
                <tr><td>Net Interest Margin</td><td>3,80%</td></tr>
                <tr><td>Dana Pihak Ketiga</td><td>Rp 48,5 Triliun</td></tr>
                <tr><td>Total Pembiayaan</td><td>Rp 52,3 Triliun</td></tr>
                <tr><td>Pembiayaan Bermasalah</td><td>1,5 Triliun</td></tr>
            </table>"#,
        );

        assert_eq!(raw.len(), 9);
        assert_eq!(raw[&Metric::TotalAssets], "Rp 60,1 Triliun");
        assert_eq!(raw[&Metric::NpfGross], "3,99%");
        assert_eq!(raw[&Metric::Car], "29,40%");
        assert_eq!(raw[&Metric::TotalFinancing], "Rp 52,3 Triliun");
    }

    #[test]
    fn test_extract_table_first_row_wins() {
        let raw = first_table(
            r#"<table>
                <tr><td>ROA</td><td>0,45%</td></tr>
                <tr><td>ROA (disetahunkan)</td><td>0,60%</td></tr>
            </table>"#,
        );
        assert_eq!(raw[&Metric::Roa], "0,45%");
    }

    #[test]
    fn test_extract_table_skips_short_and_empty_rows() {
        let raw = first_table(
            r#"<table>
                <tr><td>Total Aset</td></tr>
                <tr><td>CAR</td><td>-</td></tr>
                <tr><td>CAR</td><td>29,4%</td></tr>
            </table>"#,
        );
        assert!(!raw.contains_key(&Metric::TotalAssets));
        assert_eq!(raw[&Metric::Car], "29,4%");
    }

    #[test]
    fn test_nim_does_not_match_minimum() {
        let raw = first_table(r#"<table><tr><td>Kewajiban Penyediaan Modal Minimum</td><td>29,4%</td></tr></table>"#);
        assert_eq!(raw.get(&Metric::Car).map(String::as_str), Some("29,4%"));
        assert!(!raw.contains_key(&Metric::Nim));
    }

    #[test]
    fn test_extract_text_window() {
        let raw = extract_text(
            "Per kuartal ini, Total Aset tercatat Rp 60,1 triliun dengan NPF gross 3,99% dan CAR sebesar 29,4%. \
             ROA mencapai 0,45%.",
        );
        assert_eq!(raw[&Metric::TotalAssets], "Rp 60,1 triliun");
        assert_eq!(raw[&Metric::NpfGross], "3,99%");
        assert_eq!(raw[&Metric::Car], "29,4%");
        assert_eq!(raw[&Metric::Roa], "0,45%");
        assert!(!raw.contains_key(&Metric::Roe));
    }

    #[test]
    fn test_extract_highlights_selectors() {
        let document = Html::parse_document(
            r#"<div class="highlights">
                <span class="total-assets">Rp 60,1 T</span>
                <span class="npf">N/A</span>
                <span data-metric="npf">3,99%</span>
                <span class="capital-adequacy">29,4%</span>
            </div>"#,
        );
        let raw = extract_highlights(&document);
        assert_eq!(raw[&Metric::TotalAssets], "Rp 60,1 T");
        assert_eq!(raw[&Metric::NpfGross], "3,99%");
        assert_eq!(raw[&Metric::Car], "29,4%");
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_extract_document_highlights_then_tables() {
        let extraction = extract_document(
            r#"<html lang="id"><body>
                <span class="roa">0,45%</span>
                <table>
                    <tr><td>ROA</td><td>9,99%</td></tr>
                    <tr><td>BOPO</td><td>98,5%</td></tr>
                </table>
            </body></html>"#,
        );
        assert_eq!(extraction.locale, NumberLocale::Indonesian);
        assert_eq!(extraction.raw[&Metric::Roa], "0,45%");
        assert_eq!(extraction.raw[&Metric::Bopo], "98,5%");
        assert_eq!(extraction.probes, vec![Probe::Highlights, Probe::Tables]);
    }

    #[test]
    fn test_extract_document_falls_back_to_text() {
        let extraction = extract_document(
            r#"<html><head><meta http-equiv="Content-Language" content="en"></head>
               <body><p>Return on equity (ROE) stood at 4.2% for the period.</p></body></html>"#,
        );
        assert_eq!(extraction.locale, NumberLocale::English);
        assert_eq!(extraction.raw[&Metric::Roe], "4.2%");
        assert_eq!(extraction.probes, vec![Probe::Text]);
    }

    #[test]
    fn test_readings_report_unreadable() {
        let mut raw = RawMetrics::new();
        raw.insert(Metric::Car, "29,4%".into());
        raw.insert(Metric::Roa, "Rp".into());
        let extraction = Extraction { raw, locale: NumberLocale::Unknown, probes: vec![] };

        let (readings, unreadable) = extraction.readings();
        assert_eq!(readings[&Metric::Car].value, 29.4);
        assert_eq!(unreadable, vec![Metric::Roa]);
    }
}
