//! Auto-pause abandoned timers.
//!
//! A running timer whose last heartbeat aged past the grace period is paused
//! with the silent gap discarded, bounding drift from sessions that were
//! never stopped. Pausing (rather than stopping) leaves the reconciliation
//! decision with the user.

use anyhow::{Result, bail};
use chrono::{Duration, Utc};

use wt_core::{IdleAck, TimerAction, apply};
use wt_db::{Database, DbError};

use crate::Config;

pub fn run(db: &Database, config: &Config, grace: Option<i64>) -> Result<()> {
    let grace = grace.unwrap_or(config.sweep_grace_seconds);
    // A non-positive grace would disable idle detection inside the state
    // machine and make the discard below fold the whole abandoned gap in.
    if grace <= 0 {
        bail!("sweep grace must be positive, got {grace}s");
    }
    let now = Utc::now();
    let cutoff = now - Duration::seconds(grace);

    let aged = db.running_entries_with_heartbeat_before(cutoff)?;
    let mut swept = 0usize;
    for mut entry in aged {
        // Discard the abandoned gap: only time up to the last heartbeat
        // counts as work.
        let transition = match apply(&entry.timer, TimerAction::Pause, now, grace, Some(IdleAck::Discard)) {
            Ok(transition) => transition,
            Err(err) => {
                tracing::warn!(entry_id = %entry.id, error = %err, "skipping unsweepable entry");
                continue;
            }
        };
        entry.timer = transition.timer;

        match db.update_entry_timer(&entry) {
            Ok(_) => {
                tracing::info!(entry_id = %entry.id, "auto-paused abandoned timer");
                swept += 1;
            }
            // A concurrent action beat us to this entry; leave it alone.
            Err(DbError::WriteConflict { .. }) => {
                tracing::debug!(entry_id = %entry.id, "entry changed during sweep; skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("swept {swept} abandoned timer(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_core::{TimeEntry, TimerStatus};

    fn test_config(grace: i64) -> Config {
        Config {
            user: "u1".to_string(),
            sweep_grace_seconds: grace,
            ..Config::default()
        }
    }

    fn running_entry(id: &str, started_ago: i64, heartbeat_ago: i64) -> TimeEntry {
        let now = Utc::now();
        let mut entry = TimeEntry::new(id.to_string(), "u1".to_string(), now.date_naive());
        entry.timer.status = TimerStatus::Running;
        entry.timer.started_at = Some(now - Duration::seconds(started_ago));
        entry.timer.last_heartbeat_at = Some(now - Duration::seconds(heartbeat_ago));
        entry
    }

    #[test]
    fn test_sweep_pauses_stale_timer_and_discards_gap() {
        let db = Database::open_in_memory().unwrap();
        // Worked 1000s, then silent for 4000s.
        db.insert_entry(&running_entry("stale", 5000, 4000)).unwrap();
        db.insert_entry(&running_entry("fresh", 5000, 10)).unwrap();

        run(&db, &test_config(1800), None).unwrap();

        let stale = db.get_entry("stale", "u1").unwrap();
        assert_eq!(stale.timer.status, TimerStatus::Paused);
        // Only time up to the last heartbeat counts; the gap is discarded.
        assert_eq!(stale.timer.accumulated_seconds, 1000);
        assert_eq!(stale.version, 1);

        let fresh = db.get_entry("fresh", "u1").unwrap();
        assert_eq!(fresh.timer.status, TimerStatus::Running);
        assert_eq!(fresh.version, 0);
    }

    #[test]
    fn test_sweep_rejects_zero_grace_without_mutating() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entry(&running_entry("stale", 5000, 4000)).unwrap();

        // A zero grace must not fold the whole 4000s gap into paid time.
        let err = run(&db, &test_config(1800), Some(0)).unwrap_err();
        assert!(err.to_string().contains("grace must be positive"));

        let entry = db.get_entry("stale", "u1").unwrap();
        assert_eq!(entry.timer.status, TimerStatus::Running);
        assert_eq!(entry.timer.accumulated_seconds, 0);
    }

    #[test]
    fn test_sweep_rejects_non_positive_config_grace() {
        let db = Database::open_in_memory().unwrap();
        assert!(run(&db, &test_config(0), None).is_err());
        assert!(run(&db, &test_config(-60), None).is_err());
    }
}
