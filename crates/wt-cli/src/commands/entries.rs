//! List recorded time entries.

use anyhow::Result;

use wt_db::Database;

use crate::Config;

pub fn run(db: &Database, config: &Config, json: bool) -> Result<()> {
    let entries = db.list_entries(&config.user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("no entries");
        return Ok(());
    }
    for entry in entries {
        let description = entry.description.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {}  {:.2}h  {:.2}  {}",
            entry.entry_date,
            entry.id,
            entry.timer.status,
            entry.total_hours,
            entry.total_earnings,
            description
        );
    }
    Ok(())
}
