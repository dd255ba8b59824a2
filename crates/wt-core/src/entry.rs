//! Time entry model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// A recorded work session for one user on one calendar day.
///
/// `timer.accumulated_seconds` is the authoritative measure of work time;
/// the clock-in/out strings are client-supplied display metadata and are
/// never used for elapsed-time math. `version` backs the optimistic
/// single-writer discipline enforced by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub entry_date: NaiveDate,
    /// Informational only.
    pub clock_in: Option<String>,
    /// Informational only.
    pub clock_out: Option<String>,
    pub break_minutes: i64,
    pub timer: TimerState,
    /// Derived from `timer.accumulated_seconds` when the timer stops.
    pub total_hours: f64,
    /// Rate applied at stop time.
    pub hourly_rate: f64,
    pub total_earnings: f64,
    pub description: Option<String>,
    pub client: Option<String>,
    pub project: Option<String>,
    pub is_leave: bool,
    pub leave_type: Option<String>,
    pub version: i64,
}

impl TimeEntry {
    /// Creates a fresh entry with a stopped timer.
    #[must_use]
    pub fn new(id: String, user_id: String, entry_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            entry_date,
            clock_in: None,
            clock_out: None,
            break_minutes: 0,
            timer: TimerState::default(),
            total_hours: 0.0,
            hourly_rate: 0.0,
            total_earnings: 0.0,
            description: None,
            client: None,
            project: None,
            is_leave: false,
            leave_type: None,
            version: 0,
        }
    }

    /// Hours corresponding to the accumulated work time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hours_from_accumulated(&self) -> f64 {
        self.timer.accumulated_seconds as f64 / SECONDS_PER_HOUR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_starts_stopped_at_version_zero() {
        let entry = TimeEntry::new("e1".into(), "u1".into(), "2026-08-29".parse().unwrap());
        assert_eq!(entry.timer, TimerState::default());
        assert_eq!(entry.version, 0);
        assert_eq!(entry.total_earnings, 0.0);
    }

    #[test]
    fn test_hours_from_accumulated() {
        let mut entry = TimeEntry::new("e1".into(), "u1".into(), "2026-08-29".parse().unwrap());
        entry.timer.accumulated_seconds = 5400;
        assert_eq!(entry.hours_from_accumulated(), 1.5);
    }
}
