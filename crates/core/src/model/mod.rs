//! Quarterly snapshot data model.

pub mod metric;
pub mod quarter;
pub mod snapshot;

pub use metric::{Confidence, Metric, MetricSet, Reading, Unit};
pub use quarter::Quarter;
pub use snapshot::{ExtractionMethod, Provenance, QuarterlySnapshot, Status};
