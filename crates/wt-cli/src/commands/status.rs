//! Show active timers.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use wt_core::{TimeEntry, TimerStatus};
use wt_db::Database;

use crate::Config;

/// Display-only view of an active timer. `elapsed_seconds` includes the
/// currently running interval; the authoritative total is only folded in by
/// the state machine.
#[derive(Debug, Serialize)]
struct StatusLine {
    id: String,
    date: String,
    state: TimerStatus,
    accumulated_seconds: i64,
    elapsed_seconds: i64,
}

fn status_line(entry: &TimeEntry) -> StatusLine {
    let now = Utc::now();
    let running = entry
        .timer
        .started_at
        .map_or(0, |s| (now - s).num_seconds().max(0));
    StatusLine {
        id: entry.id.clone(),
        date: entry.entry_date.to_string(),
        state: entry.timer.status,
        accumulated_seconds: entry.timer.accumulated_seconds,
        elapsed_seconds: entry.timer.accumulated_seconds + running,
    }
}

pub fn run(db: &Database, config: &Config, json: bool) -> Result<()> {
    let active = db.active_entries(&config.user)?;
    let lines: Vec<StatusLine> = active.iter().map(status_line).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if lines.is_empty() {
        println!("no active timer");
        return Ok(());
    }
    for line in lines {
        println!(
            "{}  {}  {}  {}s accumulated ({}s with current interval)",
            line.id, line.date, line.state, line.accumulated_seconds, line.elapsed_seconds
        );
    }
    Ok(())
}
