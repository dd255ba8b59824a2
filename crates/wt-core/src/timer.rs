//! Timer state machine for a single work session.
//!
//! The machine is the only writer of `accumulated_seconds`. All elapsed-time
//! arithmetic uses the caller-supplied server clock; client timestamps are
//! accepted elsewhere as display metadata only.
//!
//! Before committing `pause`, `stop`, or `heartbeat`, the machine consults
//! [`detect_idle`](crate::idle::detect_idle). An idle gap is never silently
//! counted as work: the action is rejected with [`TimerError::Idle`] and must
//! be re-submitted with an explicit [`IdleAck`] deciding whether the gap is
//! kept or discarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::idle::detect_idle;

/// Current state of a session timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl TimerStatus {
    /// Returns the string representation for SQL storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(Self::Stopped),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            _ => Err(format!("invalid timer status: {s}")),
        }
    }
}

/// Actions that can be applied to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Stop,
    Heartbeat,
}

impl TimerAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl std::fmt::Display for TimerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timer sub-structure embedded in a time entry.
///
/// Invariants: `started_at` and `last_heartbeat_at` are `Some` iff the status
/// is `Running`; `accumulated_seconds` never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimerState {
    pub status: TimerStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: i64,
}

/// Idle condition detected while committing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleWarning {
    /// Seconds since the last heartbeat.
    pub idle_seconds: i64,
}

/// Caller's decision on how to reconcile a detected idle gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAck {
    /// Count the idle gap as work time.
    Keep,
    /// Exclude the idle gap; only time up to the last heartbeat counts.
    Discard,
}

/// Errors from applying a timer action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// The action is not legal from the current state. State is unchanged.
    #[error("cannot {action} a {from} timer")]
    InvalidTransition {
        from: TimerStatus,
        action: TimerAction,
    },
    /// The session went idle; the action was not committed. Re-submit with an
    /// explicit acknowledgement to keep or discard the idle gap.
    #[error("timer idle for {}s; re-submit with an idle acknowledgement", .0.idle_seconds)]
    Idle(IdleWarning),
}

/// A committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The timer state after the action.
    pub timer: TimerState,
    /// Seconds folded into `accumulated_seconds` by this action.
    pub elapsed_seconds: i64,
}

/// Applies a timer action at the given server time.
///
/// Pure: returns the next state without mutating the input. The caller is
/// responsible for persisting the returned state under a single-writer
/// discipline (see `wt-db`'s versioned update).
pub fn apply(
    state: &TimerState,
    action: TimerAction,
    now: DateTime<Utc>,
    idle_threshold_seconds: i64,
    ack: Option<IdleAck>,
) -> Result<Transition, TimerError> {
    match (state.status, action) {
        (TimerStatus::Stopped, TimerAction::Start)
        | (TimerStatus::Paused, TimerAction::Resume) => Ok(Transition {
            timer: TimerState {
                status: TimerStatus::Running,
                started_at: Some(now),
                last_heartbeat_at: Some(now),
                accumulated_seconds: state.accumulated_seconds,
            },
            elapsed_seconds: 0,
        }),

        (TimerStatus::Running, TimerAction::Pause) => {
            commit_running_interval(state, now, idle_threshold_seconds, ack, TimerStatus::Paused)
        }
        (TimerStatus::Running, TimerAction::Stop) => {
            commit_running_interval(state, now, idle_threshold_seconds, ack, TimerStatus::Stopped)
        }

        // No running interval to fold; a paused timer has no liveness
        // expectation, so the idle check does not apply.
        (TimerStatus::Paused, TimerAction::Stop) => Ok(Transition {
            timer: TimerState {
                status: TimerStatus::Stopped,
                started_at: None,
                last_heartbeat_at: None,
                accumulated_seconds: state.accumulated_seconds,
            },
            elapsed_seconds: 0,
        }),

        (TimerStatus::Running, TimerAction::Heartbeat) => {
            let last = state.last_heartbeat_at.or(state.started_at).unwrap_or(now);
            let status = detect_idle(now, last, idle_threshold_seconds);
            if status.is_idle {
                match ack {
                    None => return Err(TimerError::Idle(IdleWarning {
                        idle_seconds: status.idle_seconds,
                    })),
                    Some(IdleAck::Discard) => {
                        // Fold the pre-idle interval and restart the running
                        // interval at now, so the gap is excluded.
                        let worked = state
                            .started_at
                            .map_or(0, |s| (last - s).num_seconds().max(0));
                        return Ok(Transition {
                            timer: TimerState {
                                status: TimerStatus::Running,
                                started_at: Some(now),
                                last_heartbeat_at: Some(now),
                                accumulated_seconds: state.accumulated_seconds + worked,
                            },
                            elapsed_seconds: worked,
                        });
                    }
                    Some(IdleAck::Keep) => {}
                }
            }
            Ok(Transition {
                timer: TimerState {
                    last_heartbeat_at: Some(now),
                    ..*state
                },
                elapsed_seconds: 0,
            })
        }

        (from, action) => Err(TimerError::InvalidTransition { from, action }),
    }
}

/// Folds the current running interval into `accumulated_seconds` and moves to
/// `next` (Paused or Stopped), honoring idle acknowledgement.
fn commit_running_interval(
    state: &TimerState,
    now: DateTime<Utc>,
    idle_threshold_seconds: i64,
    ack: Option<IdleAck>,
    next: TimerStatus,
) -> Result<Transition, TimerError> {
    let last = state.last_heartbeat_at.or(state.started_at).unwrap_or(now);
    let status = detect_idle(now, last, idle_threshold_seconds);
    if status.is_idle && ack.is_none() {
        return Err(TimerError::Idle(IdleWarning {
            idle_seconds: status.idle_seconds,
        }));
    }

    let interval_end = if status.is_idle && ack == Some(IdleAck::Discard) {
        last
    } else {
        now
    };
    let elapsed = state
        .started_at
        .map_or(0, |s| (interval_end - s).num_seconds().max(0));

    Ok(Transition {
        timer: TimerState {
            status: next,
            started_at: None,
            last_heartbeat_at: None,
            accumulated_seconds: state.accumulated_seconds + elapsed,
        },
        elapsed_seconds: elapsed,
    })
}
