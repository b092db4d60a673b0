//! Calendar quarters.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing the given month (1-12). Out-of-range months clamp to the nearest quarter.
    pub fn from_month(month: u32) -> Self {
        match month {
            0..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    /// Parse a quarter number, 1 through 4.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Quarter of a calendar date.
    pub fn of(date: &impl Datelike) -> Self {
        Self::from_month(date.month())
    }

    /// Quarter of today's local date.
    pub fn current() -> Self {
        Self::of(&Local::now())
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_month_boundaries() {
        assert_eq!(Quarter::from_month(1), Quarter::Q1);
        assert_eq!(Quarter::from_month(3), Quarter::Q1);
        assert_eq!(Quarter::from_month(4), Quarter::Q2);
        assert_eq!(Quarter::from_month(9), Quarter::Q3);
        assert_eq!(Quarter::from_month(10), Quarter::Q4);
        assert_eq!(Quarter::from_month(12), Quarter::Q4);
    }

    #[test]
    fn test_from_number() {
        assert_eq!(Quarter::from_number(2), Some(Quarter::Q2));
        assert_eq!(Quarter::from_number(0), None);
        assert_eq!(Quarter::from_number(5), None);
    }

    #[test]
    fn test_of_date() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 17).unwrap();
        assert_eq!(Quarter::of(&date), Quarter::Q3);
    }

    #[test]
    fn test_display() {
        assert_eq!(Quarter::Q4.to_string(), "Q4");
    }
}
