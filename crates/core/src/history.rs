//! Bounded in-memory snapshot history.
//!
//! Snapshots are kept in arrival order and trimmed oldest-first once the
//! capacity is exceeded. Lookups are by recency only. Nothing is persisted:
//! the history lives exactly as long as its owner.

use crate::Error;
use crate::model::{Metric, QuarterlySnapshot};
use std::collections::{BTreeMap, VecDeque};

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Number of most recent snapshots a trend is computed over.
const TREND_WINDOW: usize = 3;

/// Metrics reported by [`History::trends`].
const TREND_METRICS: [Metric; 6] =
    [Metric::TotalAssets, Metric::NpfGross, Metric::Car, Metric::Bopo, Metric::Roa, Metric::Roe];

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<QuarterlySnapshot>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty history holding at most `capacity` snapshots (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a snapshot, evicting and returning the oldest one when over capacity.
    pub fn append(&mut self, snapshot: QuarterlySnapshot) -> Option<QuarterlySnapshot> {
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_front();
            tracing::debug!(capacity = self.capacity, "history full, evicted oldest snapshot");
            evicted
        } else {
            None
        }
    }

    pub fn latest(&self) -> Option<&QuarterlySnapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &QuarterlySnapshot> {
        self.entries.iter()
    }

    /// The `n` most recent snapshots, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &QuarterlySnapshot> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Percent change per metric across the last three snapshots.
    ///
    /// Empty until at least three snapshots exist. A metric is reported only
    /// when two or more of those snapshots carry it and the first value is positive.
    pub fn trends(&self) -> BTreeMap<Metric, f64> {
        let mut trends = BTreeMap::new();
        if self.entries.len() < TREND_WINDOW {
            return trends;
        }

        let window: Vec<&QuarterlySnapshot> = self.recent(TREND_WINDOW).collect();
        for metric in TREND_METRICS {
            let values: Vec<f64> = window.iter().filter_map(|s| s.value(metric)).collect();
            if let (Some(&start), Some(&end)) = (values.first(), values.last())
                && values.len() >= 2
                && start > 0.0
            {
                trends.insert(metric, (end - start) / start * 100.0);
            }
        }

        trends
    }

    /// Export all snapshots as a pretty-printed JSON array, oldest first.
    pub fn to_json(&self) -> Result<String, Error> {
        let snapshots: Vec<&QuarterlySnapshot> = self.entries.iter().collect();
        Ok(serde_json::to_string_pretty(&snapshots)?)
    }
}
