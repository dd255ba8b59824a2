//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use wt_core::{IdleAck, SalaryKind};

/// Work timer.
///
/// Records work sessions with a start/pause/resume/stop timer and converts
/// the recorded time into earnings using a salary history.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a time entry and start its timer.
    Start {
        /// Calendar date of the entry (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Free-text description.
        #[arg(long)]
        description: Option<String>,

        /// Client tag.
        #[arg(long)]
        client: Option<String>,

        /// Project tag.
        #[arg(long)]
        project: Option<String>,

        /// Client-reported clock-in time. Display metadata only; elapsed
        /// time is always measured on this side.
        #[arg(long)]
        at: Option<String>,
    },

    /// Pause the running timer.
    Pause {
        /// Entry ID (defaults to the single active entry).
        #[arg(long)]
        entry: Option<String>,

        /// How to reconcile a detected idle gap.
        #[arg(long, value_enum)]
        idle: Option<IdleChoice>,
    },

    /// Resume a paused timer.
    Resume {
        /// Entry ID (defaults to the single active entry).
        #[arg(long)]
        entry: Option<String>,
    },

    /// Stop the timer, resolve the rate, and compute earnings.
    Stop {
        /// Entry ID (defaults to the single active entry).
        #[arg(long)]
        entry: Option<String>,

        /// How to reconcile a detected idle gap.
        #[arg(long, value_enum)]
        idle: Option<IdleChoice>,

        /// Client-reported clock-out time. Display metadata only.
        #[arg(long)]
        at: Option<String>,
    },

    /// Record a liveness signal for the running timer.
    Heartbeat {
        /// Entry ID (defaults to the single active entry).
        #[arg(long)]
        entry: Option<String>,

        /// How to reconcile a detected idle gap.
        #[arg(long, value_enum)]
        idle: Option<IdleChoice>,
    },

    /// Show active timers.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up the hourly rate in force on a date.
    Rate {
        /// Date to resolve (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage the append-only salary history.
    Salary {
        #[command(subcommand)]
        action: SalaryAction,
    },

    /// Manage the user profile (default rate, working config, overtime).
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// List recorded time entries.
    Entries {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Auto-pause running timers whose heartbeat aged past the grace period.
    Sweep {
        /// Grace period in seconds (defaults to config).
        #[arg(long)]
        grace: Option<i64>,
    },
}

/// Salary history subcommands.
#[derive(Debug, Subcommand)]
pub enum SalaryAction {
    /// Append a salary record. Existing records are never edited.
    Add {
        /// How the amount is quoted.
        #[arg(long, value_enum)]
        kind: SalaryKindArg,

        /// Salary amount.
        #[arg(long)]
        amount: f64,

        /// First date this salary is in force.
        #[arg(long)]
        from: NaiveDate,

        /// Working hours per day (defaults to the profile).
        #[arg(long)]
        hours_per_day: Option<f64>,

        /// Working days per month (defaults to the profile).
        #[arg(long)]
        days_per_month: Option<f64>,

        /// Optional note (e.g., "annual raise").
        #[arg(long)]
        note: Option<String>,
    },

    /// List the salary history in effective-date order.
    List,
}

/// Profile subcommands.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// Update profile fields. Omitted flags keep their current values.
    Set {
        /// Flat fallback hourly rate used when the salary history is empty.
        #[arg(long)]
        default_rate: Option<f64>,

        /// Default working hours per day.
        #[arg(long)]
        hours_per_day: Option<f64>,

        /// Default working days per month.
        #[arg(long)]
        days_per_month: Option<f64>,

        /// Enable or disable overtime pay.
        #[arg(long)]
        overtime: Option<bool>,

        /// Daily hours beyond which overtime applies.
        #[arg(long)]
        overtime_threshold: Option<f64>,

        /// Rate multiplier for overtime hours.
        #[arg(long)]
        overtime_multiplier: Option<f64>,
    },

    /// Show the current profile.
    Show,
}

/// Idle reconciliation choice, from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdleChoice {
    /// Count the idle gap as work time.
    Keep,
    /// Exclude the idle gap from the total.
    Discard,
}

impl From<IdleChoice> for IdleAck {
    fn from(choice: IdleChoice) -> Self {
        match choice {
            IdleChoice::Keep => Self::Keep,
            IdleChoice::Discard => Self::Discard,
        }
    }
}

/// Salary kind, from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SalaryKindArg {
    Annual,
    Monthly,
}

impl From<SalaryKindArg> for SalaryKind {
    fn from(kind: SalaryKindArg) -> Self {
        match kind {
            SalaryKindArg::Annual => Self::Annual,
            SalaryKindArg::Monthly => Self::Monthly,
        }
    }
}
