//! Hourly rate lookup for a date.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use wt_core::{RateResolver, RateSource};
use wt_db::{Database, Profile};

use crate::Config;

/// The rate lookup response: the date queried and the rate in force.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLookup {
    date: NaiveDate,
    hourly_rate: f64,
    source: RateSource,
}

pub fn run(db: &Database, config: &Config, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let records = db.list_salary_records(&config.user)?;
    let profile = db
        .get_profile(&config.user)?
        .unwrap_or_else(|| Profile::new(config.user.clone()));

    let resolver = RateResolver::new();
    let resolved = resolver.resolve(
        &config.user,
        date,
        &records,
        profile.default_hourly_rate,
        Some(profile.overtime),
    );

    let lookup = RateLookup {
        date,
        hourly_rate: resolved.hourly_rate,
        source: resolved.source,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
    } else {
        println!("{}: {:.2}/h ({})", lookup.date, lookup.hourly_rate, lookup.source);
    }
    if resolved.source.is_degraded() {
        eprintln!("warning: rate resolved via {} fallback", resolved.source);
    }
    Ok(())
}
