//! Profile commands: default rate, working config, overtime policy.

use anyhow::Result;

use wt_db::{Database, Profile};

use crate::Config;

/// Arguments for `wt profile set`. `None` keeps the current value.
#[derive(Debug, Default)]
pub struct SetArgs {
    pub default_rate: Option<f64>,
    pub hours_per_day: Option<f64>,
    pub days_per_month: Option<f64>,
    pub overtime: Option<bool>,
    pub overtime_threshold: Option<f64>,
    pub overtime_multiplier: Option<f64>,
}

pub fn set(db: &Database, config: &Config, args: SetArgs) -> Result<()> {
    let mut profile = db
        .get_profile(&config.user)?
        .unwrap_or_else(|| Profile::new(config.user.clone()));

    if let Some(rate) = args.default_rate {
        profile.default_hourly_rate = Some(rate);
    }
    if let Some(hours) = args.hours_per_day {
        profile.working.hours_per_day = hours;
    }
    if let Some(days) = args.days_per_month {
        profile.working.days_per_month = days;
    }
    if let Some(enabled) = args.overtime {
        profile.overtime.enabled = enabled;
    }
    if let Some(threshold) = args.overtime_threshold {
        profile.overtime.threshold_hours_per_day = threshold;
    }
    if let Some(multiplier) = args.overtime_multiplier {
        profile.overtime.multiplier = multiplier;
    }

    db.upsert_profile(&profile)?;
    tracing::info!(user = %config.user, "profile updated");
    println!("profile updated for {}", config.user);
    Ok(())
}

pub fn show(db: &Database, config: &Config) -> Result<()> {
    let profile = db
        .get_profile(&config.user)?
        .unwrap_or_else(|| Profile::new(config.user.clone()));

    match profile.default_hourly_rate {
        Some(rate) => println!("default rate: {rate:.2}/h"),
        None => println!("default rate: unset"),
    }
    println!(
        "working: {}h/day x {}d/month",
        profile.working.hours_per_day, profile.working.days_per_month
    );
    if profile.overtime.enabled {
        println!(
            "overtime: enabled over {}h/day at x{}",
            profile.overtime.threshold_hours_per_day, profile.overtime.multiplier
        );
    } else {
        println!("overtime: disabled");
    }
    Ok(())
}
