//! Subcommand implementations.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use triwulan_client::{Monitor, NumberLocale, Probe, ReportLink, ScrapeReport, extract_document, find_report_links};
use triwulan_core::{AppConfig, Metric, MetricSet, Quarter, Rejection, RuleSet};
use url::Url;

/// Result of extracting a saved page without touching the network.
#[derive(Debug, Serialize)]
pub struct OfflineExtraction {
    pub quarter: Quarter,
    pub year: i32,
    /// Period came from defaults because the URL named none.
    pub period_inferred: bool,
    pub locale: NumberLocale,
    pub probes: Vec<Probe>,
    pub metrics: MetricSet,
    pub rejected: Vec<Rejection>,
    pub unreadable: Vec<Metric>,
}

pub async fn scrape(config: &AppConfig, json: bool) -> Result<()> {
    let mut monitor = Monitor::from_config(config)?;
    let report = monitor.run_cycle().await;
    print_report(&report, json)
}

pub fn extract(file: &Path, base: Option<&Url>, json: bool, rules: &RuleSet) -> Result<()> {
    let html = read_page(file)?;
    let extraction = extract_offline(&html, base, rules);

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        print!("{}", render_extraction(&extraction));
    }
    Ok(())
}

pub fn links(file: &Path, base: &Url) -> Result<()> {
    let html = read_page(file)?;
    let links = find_report_links(&html, base);
    if links.is_empty() {
        tracing::warn!("no quarterly report links found in {}", file.display());
    }
    print!("{}", render_links(&links));
    Ok(())
}

/// Scrape every `interval` until `max_cycles` is reached or Ctrl-C is pressed.
pub async fn watch(config: &AppConfig, interval: Duration, max_cycles: Option<u64>) -> Result<()> {
    let mut monitor = Monitor::from_config(config)?;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(minutes = interval.as_secs() / 60, "watching for quarterly reports");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }

        let report = monitor.run_cycle().await;
        print_report(&report, false)?;

        let stats = monitor.stats();
        tracing::info!(
            total = stats.total_scrapes,
            success_rate = format!("{:.0}%", stats.success_rate() * 100.0),
            "cycle complete"
        );
        if max_cycles.is_some_and(|max| stats.total_scrapes >= max) {
            break;
        }
    }

    let trends = monitor.history().trends();
    for (metric, change) in trends {
        println!("trend {metric}: {change:+.2}%");
    }
    Ok(())
}

fn read_page(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn print_report(report: &ScrapeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", report.snapshot);
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

/// Extract, normalize and validate a saved page. The period is read from `base` when given.
pub fn extract_offline(html: &str, base: Option<&Url>, rules: &RuleSet) -> OfflineExtraction {
    let period = ReportLink::new(base.map_or("", Url::as_str), "");
    let extraction = extract_document(html);
    let (readings, unreadable) = extraction.readings();
    let validated = rules.validate(readings);

    OfflineExtraction {
        quarter: period.quarter,
        year: period.year,
        period_inferred: period.inferred,
        locale: extraction.locale,
        probes: extraction.probes,
        metrics: validated.metrics,
        rejected: validated.rejected,
        unreadable,
    }
}

pub fn render_extraction(extraction: &OfflineExtraction) -> String {
    let mut out = String::new();
    let inferred = if extraction.period_inferred { " (inferred)" } else { "" };
    let _ = writeln!(out, "{} {}{inferred}", extraction.quarter, extraction.year);

    if extraction.metrics.is_empty() {
        let _ = writeln!(out, "no metrics found");
    }
    for (metric, reading) in &extraction.metrics {
        let (label, value, unit) = (metric.label(), reading.value, metric.unit().symbol());
        let _ = writeln!(out, "{label:<24} {value:>10} {unit}  {:?}", reading.confidence);
    }
    for rejection in &extraction.rejected {
        let _ = writeln!(out, "rejected {rejection}");
    }
    for metric in &extraction.unreadable {
        let _ = writeln!(out, "unreadable {metric}");
    }
    out
}

pub fn render_links(links: &[ReportLink]) -> String {
    let mut out = String::new();
    for link in links {
        let inferred = if link.inferred { "?" } else { "" };
        let _ = writeln!(out, "{} {}{inferred}  {}  {}", link.year, link.quarter, link.href, link.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_TABLE: &str = r#"<html lang="id"><body><table>
        <tr><td>Total Aset</td><td>Rp 60,1 Triliun</td></tr>
        <tr><td>CAR</td><td>5,5%</td></tr>
        <tr><td>ROA</td><td>0,45%</td></tr>
    </table></body></html>"#;

    #[test]
    fn test_extract_offline_validates_and_reads_period() {
        let base = Url::parse("https://bank.test/laporan/triwulan-2-2023.html").unwrap();
        let extraction = extract_offline(REPORT_TABLE, Some(&base), &RuleSet::default());

        assert_eq!((extraction.quarter, extraction.year), (Quarter::Q2, 2023));
        assert!(!extraction.period_inferred);
        assert_eq!(extraction.locale, NumberLocale::Indonesian);
        assert_eq!(extraction.metrics.get(&Metric::TotalAssets).map(|r| r.value), Some(60.1));
        assert_eq!(extraction.metrics.get(&Metric::Roa).map(|r| r.value), Some(0.45));
        assert!(!extraction.metrics.contains_key(&Metric::Car));
        assert_eq!(extraction.rejected.len(), 1);
        assert_eq!(extraction.rejected[0].metric, Metric::Car);
    }

    #[test]
    fn test_extract_offline_without_base_infers_period() {
        let extraction = extract_offline(REPORT_TABLE, None, &RuleSet::default());
        assert!(extraction.period_inferred);

        let rendered = render_extraction(&extraction);
        assert!(rendered.contains("(inferred)"));
        assert!(rendered.contains("rejected car"));
    }

    #[test]
    fn test_render_links_most_recent_first() {
        let base = Url::parse("https://bank.test/hubungan-investor/").unwrap();
        let html = r#"
            <a href="/files/laporan-q1-2024.pdf">Laporan Triwulan I 2024</a>
            <a href="/files/laporan-q3-2024.pdf">Laporan Triwulan III 2024</a>
            <a href="/kontak">Kontak</a>
        "#;
        let rendered = render_links(&find_report_links(html, &base));
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2024 Q3"));
        assert!(lines[1].starts_with("2024 Q1"));
        assert!(lines[0].contains("https://bank.test/files/laporan-q3-2024.pdf"));
    }
}
