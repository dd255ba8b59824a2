//! Salary history and hourly rate derivation.
//!
//! Salary records form an append-only log per user: past records are never
//! edited or removed, so earnings for past dates stay recomputable after a
//! raise. Resolution scans the log sorted by `effective_from`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::round2;

/// How a salary amount is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SalaryKind {
    Annual,
    #[default]
    Monthly,
}

impl SalaryKind {
    /// Returns the string representation for SQL storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for SalaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SalaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annual" => Ok(Self::Annual),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("invalid salary kind: {s}")),
        }
    }
}

/// Working-time assumptions used to convert a salary into an hourly rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkingConfig {
    pub hours_per_day: f64,
    pub days_per_month: f64,
}

impl Default for WorkingConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 8.0,
            days_per_month: 22.0,
        }
    }
}

impl WorkingConfig {
    /// Billable hours in a month under these assumptions.
    #[must_use]
    pub fn hours_per_month(&self) -> f64 {
        self.hours_per_day * self.days_per_month
    }
}

/// One entry in a user's append-only salary history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRecord {
    pub kind: SalaryKind,
    pub amount: f64,
    /// First date this salary is in force.
    pub effective_from: NaiveDate,
    /// Working-time snapshot valid for this record.
    pub working: WorkingConfig,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Picks the record in force on `date`: the latest record whose
/// `effective_from` does not exceed it.
///
/// `records` must be sorted ascending by `effective_from` (the storage layer
/// returns them that way). Binary search, so resolution stays cheap as the
/// history grows. Returns `None` when the history is empty or every record is
/// future-dated.
#[must_use]
pub fn pick_effective_record(records: &[SalaryRecord], date: NaiveDate) -> Option<&SalaryRecord> {
    let idx = records.partition_point(|r| r.effective_from <= date);
    idx.checked_sub(1).map(|i| &records[i])
}

/// Fallback when no record covers `date`: the record closest to it by
/// absolute date distance. Handles both history gaps and retroactive
/// future-dated corrections. Ties go to the earlier record.
#[must_use]
pub fn nearest_record(records: &[SalaryRecord], date: NaiveDate) -> Option<&SalaryRecord> {
    records
        .iter()
        .min_by_key(|r| (r.effective_from - date).num_days().abs())
}

/// Converts a salary into an hourly rate under the given working config.
///
/// Returns 0 when hours-per-month is non-positive rather than dividing by
/// zero; callers surface that as a degraded rate (see `rate::RateSource`).
#[must_use]
pub fn hourly_from_salary(kind: SalaryKind, amount: f64, working: &WorkingConfig) -> f64 {
    let monthly = match kind {
        SalaryKind::Annual => amount / 12.0,
        SalaryKind::Monthly => amount,
    };
    let hours_per_month = working.hours_per_month();
    if hours_per_month <= 0.0 {
        tracing::warn!(
            hours_per_day = working.hours_per_day,
            days_per_month = working.days_per_month,
            "non-positive hours per month; degrading hourly rate to 0"
        );
        return 0.0;
    }
    round2(monthly / hours_per_month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(effective_from: &str, amount: f64) -> SalaryRecord {
        SalaryRecord {
            kind: SalaryKind::Monthly,
            amount,
            effective_from: date(effective_from),
            working: WorkingConfig::default(),
            note: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_pick_effective_latest_not_exceeding_date() {
        let records = vec![
            record("2025-01-01", 4000.0),
            record("2025-06-01", 4500.0),
            record("2026-01-01", 5000.0),
        ];
        let picked = pick_effective_record(&records, date("2025-08-15")).unwrap();
        assert_eq!(picked.amount, 4500.0);
    }

    #[test]
    fn test_pick_effective_exact_boundary() {
        let records = vec![record("2025-01-01", 4000.0), record("2025-06-01", 4500.0)];
        let picked = pick_effective_record(&records, date("2025-06-01")).unwrap();
        assert_eq!(picked.amount, 4500.0);
    }

    #[test]
    fn test_pick_effective_none_when_all_future() {
        let records = vec![record("2026-01-01", 5000.0)];
        assert!(pick_effective_record(&records, date("2025-08-15")).is_none());
    }

    #[test]
    fn test_pick_effective_none_when_empty() {
        assert!(pick_effective_record(&[], date("2025-08-15")).is_none());
    }

    #[test]
    fn test_nearest_record_prefers_smallest_distance() {
        let records = vec![record("2026-01-01", 5000.0), record("2026-03-01", 5500.0)];
        // 2025-12-20 is 12 days before the first record.
        let nearest = nearest_record(&records, date("2025-12-20")).unwrap();
        assert_eq!(nearest.amount, 5000.0);
    }

    #[test]
    fn test_nearest_record_empty_history() {
        assert!(nearest_record(&[], date("2025-12-20")).is_none());
    }

    #[test]
    fn test_hourly_from_monthly_salary() {
        let working = WorkingConfig {
            hours_per_day: 8.0,
            days_per_month: 25.0,
        };
        assert_eq!(
            hourly_from_salary(SalaryKind::Monthly, 5000.0, &working),
            25.00
        );
    }

    #[test]
    fn test_hourly_from_annual_salary_rounds() {
        let working = WorkingConfig {
            hours_per_day: 8.0,
            days_per_month: 22.0,
        };
        // 120000 / 12 / 176 = 56.818... -> 56.82
        assert_eq!(
            hourly_from_salary(SalaryKind::Annual, 120_000.0, &working),
            56.82
        );
    }

    #[test]
    fn test_hourly_guards_zero_hours_per_month() {
        let working = WorkingConfig {
            hours_per_day: 0.0,
            days_per_month: 22.0,
        };
        assert_eq!(hourly_from_salary(SalaryKind::Monthly, 5000.0, &working), 0.0);
    }

    #[test]
    fn test_salary_kind_roundtrip() {
        for kind in [SalaryKind::Annual, SalaryKind::Monthly] {
            let parsed: SalaryKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("weekly".parse::<SalaryKind>().is_err());
    }
}
