//! Salary history commands.
//!
//! The history is append-only: `add` is the only mutation, and past records
//! are never edited or removed. Rate lookups cached before an `add` can stay
//! stale for up to the cache TTL (5 minutes).

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use wt_core::{SalaryKind, SalaryRecord, WorkingConfig};
use wt_db::{Database, Profile};

use crate::Config;

/// Arguments for `wt salary add`.
#[derive(Debug)]
pub struct AddArgs {
    pub kind: SalaryKind,
    pub amount: f64,
    pub effective_from: NaiveDate,
    pub hours_per_day: Option<f64>,
    pub days_per_month: Option<f64>,
    pub note: Option<String>,
}

/// Appends a record to the user's salary history.
pub fn add(db: &Database, config: &Config, args: AddArgs) -> Result<()> {
    let profile = db
        .get_profile(&config.user)?
        .unwrap_or_else(|| Profile::new(config.user.clone()));

    let record = SalaryRecord {
        kind: args.kind,
        amount: args.amount,
        effective_from: args.effective_from,
        working: WorkingConfig {
            hours_per_day: args.hours_per_day.unwrap_or(profile.working.hours_per_day),
            days_per_month: args.days_per_month.unwrap_or(profile.working.days_per_month),
        },
        note: args.note,
        created_at: Utc::now(),
    };
    let id = db.insert_salary_record(&config.user, &record)?;

    tracing::info!(
        user = %config.user,
        record_id = id,
        effective_from = %record.effective_from,
        "salary record appended"
    );
    println!(
        "added {} salary {} effective from {}",
        record.kind, record.amount, record.effective_from
    );
    Ok(())
}

/// Prints the history in effective-date order.
pub fn list(db: &Database, config: &Config) -> Result<()> {
    let records = db.list_salary_records(&config.user)?;
    if records.is_empty() {
        println!("no salary history");
        return Ok(());
    }
    for record in records {
        let note = record.note.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {:.2}  {}h/day x {}d/month  {}",
            record.effective_from,
            record.kind,
            record.amount,
            record.working.hours_per_day,
            record.working.days_per_month,
            note
        );
    }
    Ok(())
}
