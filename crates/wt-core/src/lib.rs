//! Core domain logic for the work timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Timer state machine: start/pause/resume/stop/heartbeat for a session
//! - Idle detection: deciding whether a running session was abandoned
//! - Rate resolution: picking the salary record in force on a date
//! - Earnings: converting hours and a rate into money, with overtime

pub mod earnings;
pub mod entry;
pub mod idle;
mod money;
pub mod rate;
pub mod salary;
pub mod timer;

pub use earnings::{OvertimeConfig, compute_earnings};
pub use entry::TimeEntry;
pub use idle::{IdleStatus, detect_idle};
pub use money::round2;
pub use rate::{RateResolver, RateSource, ResolvedRate};
pub use salary::{
    SalaryKind, SalaryRecord, WorkingConfig, hourly_from_salary, nearest_record,
    pick_effective_record,
};
pub use timer::{
    IdleAck, IdleWarning, TimerAction, TimerError, TimerState, TimerStatus, Transition, apply,
};
