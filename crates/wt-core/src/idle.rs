//! Idle detection for running timers.
//!
//! A running session is expected to send periodic heartbeats. When the gap
//! since the last heartbeat exceeds the configured threshold, the session is
//! considered idle and the gap must not be silently counted as work.

use chrono::{DateTime, Utc};

/// Result of an idle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleStatus {
    /// Whether the gap exceeds the threshold.
    pub is_idle: bool,
    /// Seconds since the last heartbeat (clamped to zero).
    pub idle_seconds: i64,
}

/// Checks whether a session has gone idle.
///
/// Pure function of its inputs; the threshold comes from configuration.
/// A non-positive threshold disables idle detection entirely.
#[must_use]
pub fn detect_idle(
    now: DateTime<Utc>,
    last_heartbeat_at: DateTime<Utc>,
    idle_threshold_seconds: i64,
) -> IdleStatus {
    let gap = (now - last_heartbeat_at).num_seconds().max(0);
    IdleStatus {
        is_idle: idle_threshold_seconds > 0 && gap > idle_threshold_seconds,
        idle_seconds: gap,
    }
}
