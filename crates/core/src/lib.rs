//! Core types and shared functionality for triwulan.
//!
//! This crate provides:
//! - The quarterly snapshot data model and metric schema
//! - Plausibility rules for extracted metrics
//! - The bounded in-memory snapshot history
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod rules;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use history::{DEFAULT_HISTORY_CAPACITY, History};
pub use model::{
    Confidence, ExtractionMethod, Metric, MetricSet, Provenance, Quarter, QuarterlySnapshot, Reading, Status, Unit,
};
pub use rules::{Rejection, RuleSet, Validated, ValidationRule};
