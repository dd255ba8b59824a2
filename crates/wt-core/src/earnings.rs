//! Earnings calculation with optional daily overtime.

use serde::{Deserialize, Serialize};

use crate::money::round2;

/// Multiplier used when an enabled overtime config carries a non-positive one.
const DEFAULT_OVERTIME_MULTIPLIER: f64 = 1.5;

/// Daily overtime policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvertimeConfig {
    pub enabled: bool,
    /// Hours per day beyond which the multiplier applies.
    pub threshold_hours_per_day: f64,
    /// Factor applied to the hourly rate for overtime hours.
    pub multiplier: f64,
}

impl Default for OvertimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_hours_per_day: 8.0,
            multiplier: DEFAULT_OVERTIME_MULTIPLIER,
        }
    }
}

/// Converts worked hours and an hourly rate into earnings.
///
/// With overtime enabled, hours beyond the daily threshold earn the rate
/// times the multiplier. Rounding happens once, at the end.
#[must_use]
pub fn compute_earnings(
    total_hours: f64,
    hourly_rate: f64,
    overtime: Option<&OvertimeConfig>,
) -> f64 {
    match overtime {
        Some(config) if config.enabled => {
            let multiplier = if config.multiplier > 0.0 {
                config.multiplier
            } else {
                DEFAULT_OVERTIME_MULTIPLIER
            };
            let base_hours = total_hours.min(config.threshold_hours_per_day);
            let overtime_hours = (total_hours - config.threshold_hours_per_day).max(0.0);
            round2(base_hours * hourly_rate + overtime_hours * hourly_rate * multiplier)
        }
        _ => round2(total_hours * hourly_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earnings_without_overtime() {
        assert_eq!(compute_earnings(6.0, 20.0, None), 120.00);
    }

    #[test]
    fn test_earnings_with_disabled_overtime() {
        let overtime = OvertimeConfig {
            enabled: false,
            threshold_hours_per_day: 8.0,
            multiplier: 1.5,
        };
        assert_eq!(compute_earnings(6.0, 20.0, Some(&overtime)), 120.00);
    }

    #[test]
    fn test_earnings_with_overtime() {
        let overtime = OvertimeConfig {
            enabled: true,
            threshold_hours_per_day: 8.0,
            multiplier: 1.5,
        };
        // 8 * 25 + 2 * 25 * 1.5
        assert_eq!(compute_earnings(10.0, 25.0, Some(&overtime)), 275.00);
    }

    #[test]
    fn test_earnings_under_threshold_ignores_multiplier() {
        let overtime = OvertimeConfig {
            enabled: true,
            threshold_hours_per_day: 8.0,
            multiplier: 2.0,
        };
        assert_eq!(compute_earnings(5.0, 30.0, Some(&overtime)), 150.00);
    }

    #[test]
    fn test_non_positive_multiplier_falls_back() {
        let overtime = OvertimeConfig {
            enabled: true,
            threshold_hours_per_day: 8.0,
            multiplier: 0.0,
        };
        assert_eq!(compute_earnings(10.0, 25.0, Some(&overtime)), 275.00);
    }

    #[test]
    fn test_rounding_applied_once_at_the_end() {
        // 3.333h * 9.99 = 33.296... -> 33.30
        assert_eq!(compute_earnings(3.333, 9.99, None), 33.30);
    }
}
