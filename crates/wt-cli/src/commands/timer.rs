//! Timer action commands: start, pause, resume, stop, heartbeat.
//!
//! These are the transport for the timer action endpoint: load the entry,
//! apply the state machine at the server clock, persist under the versioned
//! update. An idle condition or a write conflict surfaces to the user instead
//! of committing.

use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use wt_core::{
    IdleAck, RateResolver, ResolvedRate, TimeEntry, TimerAction, TimerError, apply,
    compute_earnings,
};
use wt_db::{Database, DbError, Profile};

use crate::Config;

/// Arguments for `wt start`.
#[derive(Debug, Default)]
pub struct StartArgs {
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub project: Option<String>,
    /// Client-reported clock-in, recorded as display metadata only.
    pub at: Option<String>,
}

/// Creates a new entry and starts its timer.
pub fn start(db: &Database, config: &Config, args: StartArgs) -> Result<()> {
    let active = db.active_entries(&config.user)?;
    if let Some(existing) = active.first() {
        bail!(
            "entry {} already has a {} timer; stop it before starting another",
            existing.id,
            existing.timer.status
        );
    }

    let now = Utc::now();
    let mut entry = TimeEntry::new(
        Uuid::new_v4().to_string(),
        config.user.clone(),
        args.date.unwrap_or_else(|| now.date_naive()),
    );
    entry.description = args.description;
    entry.client = args.client;
    entry.project = args.project;
    entry.clock_in = match args.at {
        Some(at) => {
            tracing::debug!(client_timestamp = %at, "client clock-in kept as metadata");
            Some(at)
        }
        None => Some(now.format("%H:%M").to_string()),
    };

    // Start from the initial state cannot hit an idle or transition error.
    let transition = apply(
        &entry.timer,
        TimerAction::Start,
        now,
        config.idle_threshold_seconds,
        None,
    )?;
    entry.timer = transition.timer;
    db.insert_entry(&entry)?;

    tracing::info!(entry_id = %entry.id, user = %config.user, "timer started");
    println!("started entry {} ({})", entry.id, entry.entry_date);
    Ok(())
}

/// Applies `pause`, `resume`, `stop`, or `heartbeat` to an entry.
pub fn act(
    db: &Database,
    config: &Config,
    action: TimerAction,
    entry_id: Option<&str>,
    ack: Option<IdleAck>,
    at: Option<String>,
) -> Result<()> {
    let mut entry = find_entry(db, config, entry_id)?;
    let now = Utc::now();

    let transition = match apply(
        &entry.timer,
        action,
        now,
        config.idle_threshold_seconds,
        ack,
    ) {
        Ok(transition) => transition,
        Err(TimerError::Idle(warning)) => bail!(
            "timer idle: no heartbeat for {}s; nothing committed. \
             Re-run with --idle keep to count the gap or --idle discard to drop it",
            warning.idle_seconds
        ),
        Err(err @ TimerError::InvalidTransition { .. }) => return Err(err.into()),
    };
    entry.timer = transition.timer;

    let resolved = if action == TimerAction::Stop {
        Some(finalize_earnings(db, config, &mut entry, at, now)?)
    } else {
        None
    };

    entry.version = persist_timer(db, &entry)?;

    match action {
        TimerAction::Pause => println!(
            "paused entry {} at {}s accumulated",
            entry.id, entry.timer.accumulated_seconds
        ),
        TimerAction::Resume => println!("resumed entry {}", entry.id),
        TimerAction::Heartbeat => println!(
            "heartbeat recorded for entry {} ({}s accumulated)",
            entry.id, entry.timer.accumulated_seconds
        ),
        TimerAction::Stop => {
            println!(
                "stopped entry {}: {:.2}h at {:.2}/h = {:.2}",
                entry.id, entry.total_hours, entry.hourly_rate, entry.total_earnings
            );
            if let Some(resolved) = resolved {
                if resolved.source.is_degraded() {
                    eprintln!(
                        "warning: hourly rate resolved via {} fallback; \
                         check `wt salary list` and `wt profile show`",
                        resolved.source
                    );
                }
            }
        }
        TimerAction::Start => unreachable!("start goes through start()"),
    }
    Ok(())
}

/// Persists the timer under the versioned update, keeping the error
/// taxonomy distinct: a lost race gets refetch-and-retry guidance, while a
/// missing entry reads as not-found.
fn persist_timer(db: &Database, entry: &TimeEntry) -> Result<i64> {
    match db.update_entry_timer(entry) {
        Ok(version) => Ok(version),
        Err(err @ DbError::WriteConflict { .. }) => Err(anyhow::Error::new(err)
            .context("entry was modified concurrently; refetch and retry")),
        Err(err) => Err(err.into()),
    }
}

/// Resolves the entry to act on: an explicit ID, or the single active entry.
fn find_entry(db: &Database, config: &Config, entry_id: Option<&str>) -> Result<TimeEntry> {
    if let Some(id) = entry_id {
        return Ok(db.get_entry(id, &config.user)?);
    }
    let mut active = db.active_entries(&config.user)?;
    match active.len() {
        0 => bail!("no active timer; run `wt start` first"),
        1 => Ok(active.remove(0)),
        _ => {
            let ids: Vec<&str> = active.iter().map(|e| e.id.as_str()).collect();
            bail!(
                "multiple active entries ({}); pass --entry to pick one",
                ids.join(", ")
            )
        }
    }
}

/// Resolves the rate for the entry's date and computes final earnings.
fn finalize_earnings(
    db: &Database,
    config: &Config,
    entry: &mut TimeEntry,
    at: Option<String>,
    now: chrono::DateTime<Utc>,
) -> Result<ResolvedRate> {
    let records = db.list_salary_records(&config.user)?;
    let profile = db
        .get_profile(&config.user)?
        .unwrap_or_else(|| Profile::new(config.user.clone()));

    let resolver = RateResolver::new();
    let resolved = resolver.resolve(
        &config.user,
        entry.entry_date,
        &records,
        profile.default_hourly_rate,
        Some(profile.overtime),
    );

    entry.total_hours = entry.hours_from_accumulated();
    entry.hourly_rate = resolved.hourly_rate;
    entry.total_earnings =
        compute_earnings(entry.total_hours, resolved.hourly_rate, resolved.overtime.as_ref());
    entry.clock_out = match at {
        Some(at) => {
            tracing::debug!(client_timestamp = %at, "client clock-out kept as metadata");
            Some(at)
        }
        None => Some(now.format("%H:%M").to_string()),
    };

    tracing::info!(
        entry_id = %entry.id,
        hours = entry.total_hours,
        rate = entry.hourly_rate,
        earnings = entry.total_earnings,
        source = %resolved.source,
        "entry finalized"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_core::{SalaryKind, SalaryRecord, TimerStatus, WorkingConfig};

    fn test_config(user: &str) -> Config {
        Config {
            user: user.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_start_then_stop_resolves_rate() {
        let db = Database::open_in_memory().unwrap();
        let config = test_config("u1");
        db.insert_salary_record(
            "u1",
            &SalaryRecord {
                kind: SalaryKind::Monthly,
                amount: 5000.0,
                effective_from: "2020-01-01".parse().unwrap(),
                working: WorkingConfig {
                    hours_per_day: 8.0,
                    days_per_month: 25.0,
                },
                note: None,
                created_at: Utc::now(),
            },
        )
        .unwrap();

        start(&db, &config, StartArgs::default()).unwrap();
        let active = db.active_entries("u1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].timer.status, TimerStatus::Running);

        act(&db, &config, TimerAction::Stop, None, None, None).unwrap();
        let entries = db.list_entries("u1").unwrap();
        assert_eq!(entries[0].timer.status, TimerStatus::Stopped);
        assert_eq!(entries[0].hourly_rate, 25.00);
        assert!(entries[0].clock_out.is_some());
    }

    #[test]
    fn test_second_start_rejected_while_active() {
        let db = Database::open_in_memory().unwrap();
        let config = test_config("u1");
        start(&db, &config, StartArgs::default()).unwrap();
        assert!(start(&db, &config, StartArgs::default()).is_err());
    }

    #[test]
    fn test_pause_without_active_timer_fails() {
        let db = Database::open_in_memory().unwrap();
        let config = test_config("u1");
        let err = act(&db, &config, TimerAction::Pause, None, None, None).unwrap_err();
        assert!(err.to_string().contains("no active timer"));
    }

    #[test]
    fn test_pause_stopped_entry_is_invalid_transition() {
        let db = Database::open_in_memory().unwrap();
        let config = test_config("u1");
        let entry = TimeEntry::new("e1".into(), "u1".into(), "2026-08-29".parse().unwrap());
        db.insert_entry(&entry).unwrap();

        let err = act(&db, &config, TimerAction::Pause, Some("e1"), None, None).unwrap_err();
        assert!(err.downcast_ref::<TimerError>().is_some());
        // State unchanged.
        let fetched = db.get_entry("e1", "u1").unwrap();
        assert_eq!(fetched.timer.status, TimerStatus::Stopped);
        assert_eq!(fetched.version, 0);
    }

    #[test]
    fn test_stop_with_empty_history_uses_default_rate() {
        let db = Database::open_in_memory().unwrap();
        let config = test_config("u1");
        let mut profile = Profile::new("u1".to_string());
        profile.default_hourly_rate = Some(12.0);
        db.upsert_profile(&profile).unwrap();

        start(&db, &config, StartArgs::default()).unwrap();
        act(&db, &config, TimerAction::Stop, None, None, None).unwrap();

        let entries = db.list_entries("u1").unwrap();
        assert_eq!(entries[0].hourly_rate, 12.0);
    }

    #[test]
    fn test_persist_timer_conflict_suggests_retry() {
        let db = Database::open_in_memory().unwrap();
        let entry = TimeEntry::new("e1".into(), "u1".into(), "2026-08-29".parse().unwrap());
        db.insert_entry(&entry).unwrap();

        // Another writer bumps the version first.
        let mut winner = db.get_entry("e1", "u1").unwrap();
        winner.timer.status = TimerStatus::Paused;
        db.update_entry_timer(&winner).unwrap();

        let err = persist_timer(&db, &entry).unwrap_err();
        assert!(err.to_string().contains("modified concurrently"));
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::WriteConflict { .. })
        ));
    }

    #[test]
    fn test_persist_timer_missing_entry_reads_as_not_found() {
        let db = Database::open_in_memory().unwrap();
        let entry = TimeEntry::new("ghost".into(), "u1".into(), "2026-08-29".parse().unwrap());

        let err = persist_timer(&db, &entry).unwrap_err();
        assert!(!err.to_string().contains("modified concurrently"));
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_entry_of_other_user_not_found() {
        let db = Database::open_in_memory().unwrap();
        let entry = TimeEntry::new("e1".into(), "someone-else".into(), "2026-08-29".parse().unwrap());
        db.insert_entry(&entry).unwrap();

        let config = test_config("u1");
        let err = act(&db, &config, TimerAction::Stop, Some("e1"), None, None).unwrap_err();
        assert!(err.downcast_ref::<wt_db::DbError>().is_some());
    }
}
