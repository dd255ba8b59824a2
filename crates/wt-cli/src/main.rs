use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{entries, profile, rate, salary, status, sweep, timer};
use wt_cli::{Cli, Commands, Config, ProfileAction, SalaryAction};
use wt_core::TimerAction;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match cli.command {
        Some(Commands::Start {
            date,
            description,
            client,
            project,
            at,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::start(
                &db,
                &config,
                timer::StartArgs {
                    date,
                    description,
                    client,
                    project,
                    at,
                },
            )?;
        }
        Some(Commands::Pause { entry, idle }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::act(
                &db,
                &config,
                TimerAction::Pause,
                entry.as_deref(),
                idle.map(Into::into),
                None,
            )?;
        }
        Some(Commands::Resume { entry }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::act(&db, &config, TimerAction::Resume, entry.as_deref(), None, None)?;
        }
        Some(Commands::Stop { entry, idle, at }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::act(
                &db,
                &config,
                TimerAction::Stop,
                entry.as_deref(),
                idle.map(Into::into),
                at,
            )?;
        }
        Some(Commands::Heartbeat { entry, idle }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::act(
                &db,
                &config,
                TimerAction::Heartbeat,
                entry.as_deref(),
                idle.map(Into::into),
                None,
            )?;
        }
        Some(Commands::Status { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&db, &config, json)?;
        }
        Some(Commands::Rate { date, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            rate::run(&db, &config, date, json)?;
        }
        Some(Commands::Salary { action }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            match action {
                SalaryAction::Add {
                    kind,
                    amount,
                    from,
                    hours_per_day,
                    days_per_month,
                    note,
                } => salary::add(
                    &db,
                    &config,
                    salary::AddArgs {
                        kind: kind.into(),
                        amount,
                        effective_from: from,
                        hours_per_day,
                        days_per_month,
                        note,
                    },
                )?,
                SalaryAction::List => salary::list(&db, &config)?,
            }
        }
        Some(Commands::Profile { action }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            match action {
                ProfileAction::Set {
                    default_rate,
                    hours_per_day,
                    days_per_month,
                    overtime,
                    overtime_threshold,
                    overtime_multiplier,
                } => profile::set(
                    &db,
                    &config,
                    profile::SetArgs {
                        default_rate,
                        hours_per_day,
                        days_per_month,
                        overtime,
                        overtime_threshold,
                        overtime_multiplier,
                    },
                )?,
                ProfileAction::Show => profile::show(&db, &config)?,
            }
        }
        Some(Commands::Entries { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            entries::run(&db, &config, json)?;
        }
        Some(Commands::Sweep { grace }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            sweep::run(&db, &config, grace)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
