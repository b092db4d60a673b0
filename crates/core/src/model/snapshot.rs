//! Point-in-time extraction results.
//!
//! A [`QuarterlySnapshot`] is either a success carrying validated readings and
//! their provenance, or an error carrying only a message. The error variant has
//! no place to put metrics, so an error snapshot can never leak numbers.
//!
//! Serialized form (the contract owed to UI and orchestrator consumers):
//!
//! ```json
//! {
//!   "status": "success",
//!   "timestamp": "2025-01-20T00:00:00Z",
//!   "quarter": "Q4",
//!   "year": 2024,
//!   "source": "report_html@https://…",
//!   "provenance": { "kind": "extracted", "url": "https://…", "method": "report_html" },
//!   "confidence": { "car": "high" },
//!   "car": 29.42
//! }
//! ```

use super::metric::{Confidence, Metric, MetricSet, Reading};
use super::quarter::Quarter;
use crate::Error;
use crate::rules::{Rejection, Validated};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Extraction path that produced real values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// A linked quarterly report served as HTML.
    ReportHtml,
    /// Highlight blocks and tables on an investor-relations page.
    Highlights,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::ReportHtml => "report_html",
            ExtractionMethod::Highlights => "highlights",
        }
    }
}

/// Where the values of a successful snapshot came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Read from a document.
    Extracted { url: String, method: ExtractionMethod },
    /// Synthesized from the last published figures; not real data.
    Estimated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report_url: Option<String>,
    },
}

impl Provenance {
    pub fn is_estimated(&self) -> bool {
        matches!(self, Provenance::Estimated { .. })
    }

    /// Human-readable source tag.
    pub fn source_tag(&self) -> String {
        match self {
            Provenance::Extracted { url, method } => format!("{}@{}", method.as_str(), url),
            Provenance::Estimated { report_url: Some(url) } => format!("estimated@{url}"),
            Provenance::Estimated { report_url: None } => "estimated".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Success { provenance: Provenance, metrics: MetricSet, rejected: Vec<Rejection> },
    Error { source: String, message: String },
}

/// The result of one scrape cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SnapshotRecord", try_from = "SnapshotRecord")]
pub struct QuarterlySnapshot {
    timestamp: DateTime<Utc>,
    quarter: Quarter,
    year: i32,
    outcome: Outcome,
}

impl QuarterlySnapshot {
    /// Build a success snapshot from validated readings.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoData` if validation left no metrics.
    pub fn success(
        timestamp: DateTime<Utc>, quarter: Quarter, year: i32, provenance: Provenance, validated: Validated,
    ) -> Result<Self, Error> {
        if validated.metrics.is_empty() {
            return Err(Error::NoData("no metric passed validation".into()));
        }

        Ok(Self {
            timestamp,
            quarter,
            year,
            outcome: Outcome::Success { provenance, metrics: validated.metrics, rejected: validated.rejected },
        })
    }

    /// Build an error snapshot. Error snapshots never carry metrics.
    pub fn error(
        timestamp: DateTime<Utc>, quarter: Quarter, year: i32, source: impl Into<String>, message: impl Into<String>,
    ) -> Self {
        Self { timestamp, quarter, year, outcome: Outcome::Error { source: source.into(), message: message.into() } }
    }

    pub fn status(&self) -> Status {
        match self.outcome {
            Outcome::Success { .. } => Status::Success,
            Outcome::Error { .. } => Status::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Validated readings; `None` for error snapshots.
    pub fn metrics(&self) -> Option<&MetricSet> {
        match &self.outcome {
            Outcome::Success { metrics, .. } => Some(metrics),
            Outcome::Error { .. } => None,
        }
    }

    pub fn reading(&self, metric: Metric) -> Option<&Reading> {
        self.metrics().and_then(|m| m.get(&metric))
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.reading(metric).map(|r| r.value)
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.outcome {
            Outcome::Success { provenance, .. } => Some(provenance),
            Outcome::Error { .. } => None,
        }
    }

    /// Whether the values were synthesized rather than read from a document.
    pub fn is_estimated(&self) -> bool {
        self.provenance().is_some_and(Provenance::is_estimated)
    }

    /// Metrics dropped by range validation.
    pub fn rejected(&self) -> &[Rejection] {
        match &self.outcome {
            Outcome::Success { rejected, .. } => rejected,
            Outcome::Error { .. } => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Error { message, .. } => Some(message),
        }
    }

    pub fn source_tag(&self) -> String {
        match &self.outcome {
            Outcome::Success { provenance, .. } => provenance.source_tag(),
            Outcome::Error { source, .. } => source.clone(),
        }
    }

    /// Schema metrics with no validated reading.
    pub fn missing(&self) -> Vec<Metric> {
        Metric::ALL.into_iter().filter(|m| self.reading(*m).is_none()).collect()
    }
}

impl fmt::Display for QuarterlySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.quarter, self.year, self.source_tag())?;
        match &self.outcome {
            Outcome::Success { metrics, .. } => {
                for (metric, reading) in metrics {
                    write!(f, " {}={}", metric, reading.value)?;
                }
                Ok(())
            }
            Outcome::Error { message, .. } => write!(f, " error: {message}"),
        }
    }
}

/// Flat wire form of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotRecord {
    status: Status,
    timestamp: DateTime<Utc>,
    quarter: Quarter,
    year: i32,
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rejected: Vec<Rejection>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    confidence: BTreeMap<Metric, Confidence>,
    #[serde(flatten)]
    values: BTreeMap<Metric, f64>,
}

impl From<QuarterlySnapshot> for SnapshotRecord {
    fn from(snapshot: QuarterlySnapshot) -> Self {
        let source = snapshot.source_tag();
        let QuarterlySnapshot { timestamp, quarter, year, outcome } = snapshot;

        match outcome {
            Outcome::Success { provenance, metrics, rejected } => SnapshotRecord {
                status: Status::Success,
                timestamp,
                quarter,
                year,
                source,
                provenance: Some(provenance),
                error: None,
                rejected,
                confidence: metrics.iter().map(|(m, r)| (*m, r.confidence)).collect(),
                values: metrics.iter().map(|(m, r)| (*m, r.value)).collect(),
            },
            Outcome::Error { message, .. } => SnapshotRecord {
                status: Status::Error,
                timestamp,
                quarter,
                year,
                source,
                provenance: None,
                error: Some(message),
                rejected: Vec::new(),
                confidence: BTreeMap::new(),
                values: BTreeMap::new(),
            },
        }
    }
}

impl TryFrom<SnapshotRecord> for QuarterlySnapshot {
    type Error = String;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        match record.status {
            Status::Error => {
                if !record.values.is_empty() {
                    return Err("error snapshot must not carry metric values".into());
                }
                Ok(QuarterlySnapshot::error(
                    record.timestamp,
                    record.quarter,
                    record.year,
                    record.source,
                    record.error.unwrap_or_default(),
                ))
            }
            Status::Success => {
                let provenance = record
                    .provenance
                    .ok_or_else(|| "success snapshot requires provenance".to_string())?;
                if record.values.is_empty() {
                    return Err("success snapshot requires at least one metric".into());
                }
                let metrics = record
                    .values
                    .into_iter()
                    .map(|(metric, value)| {
                        let confidence = record.confidence.get(&metric).copied().unwrap_or(Confidence::Low);
                        (metric, Reading::new(value, confidence))
                    })
                    .collect();
                Ok(QuarterlySnapshot {
                    timestamp: record.timestamp,
                    quarter: record.quarter,
                    year: record.year,
                    outcome: Outcome::Success { provenance, metrics, rejected: record.rejected },
                })
            }
        }
    }
}
