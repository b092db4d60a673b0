//! Plausibility ranges for extracted metrics.
//!
//! Every metric has an inclusive `[min, max]` range. A value outside its range
//! is dropped from the snapshot on its own; the remaining metrics are kept.
//! There is no cross-metric reconciliation.

use crate::model::{Metric, MetricSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inclusive plausible range for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub min: f64,
    pub max: f64,
}

impl ValidationRule {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies inside the range, bounds included. NaN is never inside.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// A metric value dropped because it fell outside its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub metric: Metric,
    pub value: f64,
    pub rule: ValidationRule,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (out of range {})", self.metric, self.value, self.rule)
    }
}

/// Outcome of validating a set of readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    pub metrics: MetricSet,
    pub rejected: Vec<Rejection>,
}

/// Default ranges, indexed by [`Metric::index`].
const DEFAULT_RULES: [ValidationRule; 9] = [
    ValidationRule::new(10.0, 100.0),  // total_assets, trillion Rp
    ValidationRule::new(0.0, 15.0),    // npf_gross
    ValidationRule::new(8.0, 50.0),    // car, regulatory floor 8%
    ValidationRule::new(50.0, 120.0),  // bopo
    ValidationRule::new(-5.0, 10.0),   // roa
    ValidationRule::new(-20.0, 30.0),  // roe
    ValidationRule::new(0.0, 10.0),    // nim
    ValidationRule::new(10.0, 100.0),  // total_dph, trillion Rp
    ValidationRule::new(10.0, 100.0),  // total_financing, trillion Rp
];

/// The complete rule table, one rule per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: [ValidationRule; 9],
}

impl Default for RuleSet {
    fn default() -> Self {
        Self { rules: DEFAULT_RULES }
    }
}

impl RuleSet {
    /// Default rules with the given per-metric overrides applied.
    pub fn with_overrides(overrides: &BTreeMap<Metric, ValidationRule>) -> Self {
        let mut set = Self::default();
        for (metric, rule) in overrides {
            set.rules[metric.index()] = *rule;
        }
        set
    }

    pub fn rule(&self, metric: Metric) -> ValidationRule {
        self.rules[metric.index()]
    }

    /// Accept `value` if it lies inside the metric's range.
    pub fn check(&self, metric: Metric, value: f64) -> Result<f64, Rejection> {
        let rule = self.rule(metric);
        if rule.contains(value) { Ok(value) } else { Err(Rejection { metric, value, rule }) }
    }

    /// Keep in-range readings and record the rest as rejections.
    pub fn validate(&self, readings: MetricSet) -> Validated {
        let mut validated = Validated::default();

        for (metric, reading) in readings {
            match self.check(metric, reading.value) {
                Ok(_) => {
                    tracing::debug!(metric = %metric, value = reading.value, "metric within range");
                    validated.metrics.insert(metric, reading);
                }
                Err(rejection) => {
                    tracing::warn!(
                        metric = %metric,
                        value = reading.value,
                        min = rejection.rule.min,
                        max = rejection.rule.max,
                        "metric out of plausible range, dropped"
                    );
                    validated.rejected.push(rejection);
                }
            }
        }

        validated
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, ValidationRule)> + '_ {
        Metric::ALL.into_iter().map(|m| (m, self.rule(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, Reading};

    fn reading(value: f64) -> Reading {
        Reading::new(value, Confidence::High)
    }

    #[test]
    fn test_bounds_are_inclusive_for_every_metric() {
        let rules = RuleSet::default();
        for (metric, rule) in rules.iter() {
            assert_eq!(rules.check(metric, rule.min), Ok(rule.min), "{metric} min");
            assert_eq!(rules.check(metric, rule.max), Ok(rule.max), "{metric} max");
        }
    }

    #[test]
    fn test_strictly_outside_is_rejected_for_every_metric() {
        let rules = RuleSet::default();
        for (metric, rule) in rules.iter() {
            assert!(rules.check(metric, rule.min - 0.01).is_err(), "{metric} below");
            assert!(rules.check(metric, rule.max + 0.01).is_err(), "{metric} above");
        }
    }

    #[test]
    fn test_nan_is_rejected() {
        let rules = RuleSet::default();
        assert!(rules.check(Metric::Car, f64::NAN).is_err());
    }

    #[test]
    fn test_default_car_range() {
        let rule = RuleSet::default().rule(Metric::Car);
        assert_eq!(rule, ValidationRule::new(8.0, 50.0));
    }

    #[test]
    fn test_validate_drops_single_field() {
        let mut readings = MetricSet::new();
        readings.insert(Metric::Car, reading(5.5));
        readings.insert(Metric::NpfGross, reading(3.99));
        readings.insert(Metric::Bopo, reading(98.5));

        let validated = RuleSet::default().validate(readings);

        assert!(!validated.metrics.contains_key(&Metric::Car));
        assert_eq!(validated.metrics.len(), 2);
        assert_eq!(validated.rejected.len(), 1);
        assert_eq!(validated.rejected[0].metric, Metric::Car);
        assert_eq!(validated.rejected[0].value, 5.5);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Metric::Car, ValidationRule::new(5.0, 60.0));
        let rules = RuleSet::with_overrides(&overrides);

        assert_eq!(rules.check(Metric::Car, 5.5), Ok(5.5));
        assert_eq!(rules.rule(Metric::Bopo), ValidationRule::new(50.0, 120.0));
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection { metric: Metric::Car, value: 5.5, rule: ValidationRule::new(8.0, 50.0) };
        assert_eq!(rejection.to_string(), "car: 5.5 (out of range [8, 50])");
    }
}
