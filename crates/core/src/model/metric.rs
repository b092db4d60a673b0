//! The fixed metric schema of a quarterly snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the nine financial metrics tracked per quarter.
///
/// Declaration order is the schema order used for display and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Total assets, trillion Rupiah.
    TotalAssets,
    /// Gross non-performing financing ratio, percent.
    NpfGross,
    /// Capital adequacy ratio, percent.
    Car,
    /// Operating expense to operating income, percent.
    Bopo,
    /// Return on assets, percent.
    Roa,
    /// Return on equity, percent.
    Roe,
    /// Net margin, percent.
    Nim,
    /// Third-party funds (Dana Pihak Ketiga), trillion Rupiah.
    TotalDph,
    /// Total financing (Pembiayaan), trillion Rupiah.
    TotalFinancing,
}

/// Unit a metric is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    TrillionRupiah,
    Percent,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Unit::TrillionRupiah => "T Rp",
            Unit::Percent => "%",
        }
    }
}

impl Metric {
    /// All metrics in schema order.
    pub const ALL: [Metric; 9] = [
        Metric::TotalAssets,
        Metric::NpfGross,
        Metric::Car,
        Metric::Bopo,
        Metric::Roa,
        Metric::Roe,
        Metric::Nim,
        Metric::TotalDph,
        Metric::TotalFinancing,
    ];

    /// Position in [`Metric::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case key used in JSON and configuration.
    pub const fn key(self) -> &'static str {
        match self {
            Metric::TotalAssets => "total_assets",
            Metric::NpfGross => "npf_gross",
            Metric::Car => "car",
            Metric::Bopo => "bopo",
            Metric::Roa => "roa",
            Metric::Roe => "roe",
            Metric::Nim => "nim",
            Metric::TotalDph => "total_dph",
            Metric::TotalFinancing => "total_financing",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Metric::TotalAssets => "Total Aset",
            Metric::NpfGross => "NPF Gross",
            Metric::Car => "CAR",
            Metric::Bopo => "BOPO",
            Metric::Roa => "ROA",
            Metric::Roe => "ROE",
            Metric::Nim => "NIM",
            Metric::TotalDph => "Dana Pihak Ketiga",
            Metric::TotalFinancing => "Total Pembiayaan",
        }
    }

    pub const fn unit(self) -> Unit {
        match self {
            Metric::TotalAssets | Metric::TotalDph | Metric::TotalFinancing => Unit::TrillionRupiah,
            _ => Unit::Percent,
        }
    }

    /// Look a metric up by its snake-case key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How much a reading can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Unambiguous number, or disambiguated by an explicit locale hint.
    High,
    /// The separator heuristic had to guess.
    Low,
    /// Synthesized by the estimator, never read from a document.
    Estimated,
}

/// A single metric value together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub confidence: Confidence,
    /// Source text the value was normalized from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Reading {
    pub fn new(value: f64, confidence: Confidence) -> Self {
        Self { value, confidence, raw: None }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// Readings keyed by metric, in schema order.
pub type MetricSet = BTreeMap<Metric, Reading>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_in_schema_order() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
    }

    #[test]
    fn test_key_roundtrip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_key(metric.key()), Some(metric));
        }
        assert_eq!(Metric::from_key("fdr"), None);
    }

    #[test]
    fn test_serde_key_matches_key() {
        let json = serde_json::to_string(&Metric::TotalFinancing).unwrap();
        assert_eq!(json, "\"total_financing\"");
    }

    #[test]
    fn test_units() {
        assert_eq!(Metric::TotalAssets.unit(), Unit::TrillionRupiah);
        assert_eq!(Metric::TotalDph.unit(), Unit::TrillionRupiah);
        assert_eq!(Metric::Car.unit(), Unit::Percent);
    }

    #[test]
    fn test_reading_raw_skipped_when_absent() {
        let json = serde_json::to_value(Reading::new(29.42, Confidence::High)).unwrap();
        assert!(json.get("raw").is_none());

        let json = serde_json::to_value(Reading::new(29.42, Confidence::High).with_raw("29,42%")).unwrap();
        assert_eq!(json["raw"], "29,42%");
    }
}
