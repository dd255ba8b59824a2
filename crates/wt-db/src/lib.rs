//! Storage layer for the work timer.
//!
//! Provides persistence for time entries, salary history, and user profiles
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization (a `Mutex`, a
//! connection pool, or one instance per thread).
//!
//! # Concurrency discipline
//!
//! Each entry's timer sub-structure must be mutated by a single writer at a
//! time. [`Database::update_entry_timer`] enforces this optimistically: the
//! update is predicated on the version the caller read, and a second writer
//! racing on stale state observes [`DbError::WriteConflict`] and must refetch
//! and retry. The write is a single statement, so the state transition and
//! the accumulated seconds land atomically.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2024-01-15T10:30:00Z`); dates as `YYYY-MM-DD`. Lexicographic ordering
//! matches chronological ordering and values stay human-readable.
//!
//! `salary_records` is append-only: this crate exposes insert and ordered
//! list operations only, preserving the audit trail that lets past dates be
//! recomputed after later raises.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use wt_core::{OvertimeConfig, SalaryKind, SalaryRecord, TimeEntry, TimerState, TimerStatus, WorkingConfig};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The entry does not exist or does not belong to the caller.
    #[error("time entry not found: {id}")]
    EntryNotFound { id: String },
    /// The entry was modified concurrently; refetch and retry.
    #[error("time entry {id} was modified concurrently (expected version {expected})")]
    WriteConflict { id: String, expected: i64 },
    /// A stored timestamp failed to parse.
    #[error("invalid timestamp in {column} for entry {id}: {value}")]
    TimestampParse {
        id: String,
        column: &'static str,
        value: String,
    },
    /// A stored enum string failed to parse.
    #[error("invalid {column} for {id}: {value}")]
    InvalidField {
        id: String,
        column: &'static str,
        value: String,
    },
}

/// Per-user configuration consumed by rate resolution and earnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    /// Flat fallback rate when the salary history is empty.
    pub default_hourly_rate: Option<f64>,
    /// Working-time assumptions applied to new salary records by default.
    pub working: WorkingConfig,
    pub overtime: OvertimeConfig,
}

impl Profile {
    /// A profile with no default rate and default working assumptions.
    #[must_use]
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            default_hourly_rate: None,
            working: WorkingConfig::default(),
            overtime: OvertimeConfig::default(),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                entry_date TEXT NOT NULL,
                clock_in TEXT,
                clock_out TEXT,
                break_minutes INTEGER NOT NULL DEFAULT 0,
                timer_status TEXT NOT NULL DEFAULT 'stopped',
                started_at TEXT,
                last_heartbeat_at TEXT,
                accumulated_seconds INTEGER NOT NULL DEFAULT 0,
                total_hours REAL NOT NULL DEFAULT 0,
                hourly_rate REAL NOT NULL DEFAULT 0,
                total_earnings REAL NOT NULL DEFAULT 0,
                description TEXT,
                client TEXT,
                project TEXT,
                is_leave INTEGER NOT NULL DEFAULT 0,
                leave_type TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_entries_user_date
                ON time_entries(user_id, entry_date);
            CREATE INDEX IF NOT EXISTS idx_entries_status
                ON time_entries(timer_status);

            -- Append-only: no UPDATE or DELETE is ever issued against this
            -- table; corrections are new rows with a later created_at.
            CREATE TABLE IF NOT EXISTS salary_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                effective_from TEXT NOT NULL,
                hours_per_day REAL NOT NULL,
                days_per_month REAL NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_salary_user_effective
                ON salary_records(user_id, effective_from);

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                default_hourly_rate REAL,
                hours_per_day REAL NOT NULL DEFAULT 8,
                days_per_month REAL NOT NULL DEFAULT 22,
                overtime_enabled INTEGER NOT NULL DEFAULT 0,
                overtime_threshold_hours REAL NOT NULL DEFAULT 8,
                overtime_multiplier REAL NOT NULL DEFAULT 1.5
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a new time entry.
    pub fn insert_entry(&self, entry: &TimeEntry) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO time_entries
            (id, user_id, entry_date, clock_in, clock_out, break_minutes,
             timer_status, started_at, last_heartbeat_at, accumulated_seconds,
             total_hours, hourly_rate, total_earnings, description, client,
             project, is_leave, leave_type, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                entry.id,
                entry.user_id,
                entry.entry_date.to_string(),
                entry.clock_in,
                entry.clock_out,
                entry.break_minutes,
                entry.timer.status.as_str(),
                entry.timer.started_at.map(format_timestamp),
                entry.timer.last_heartbeat_at.map(format_timestamp),
                entry.timer.accumulated_seconds,
                entry.total_hours,
                entry.hourly_rate,
                entry.total_earnings,
                entry.description,
                entry.client,
                entry.project,
                entry.is_leave,
                entry.leave_type,
                entry.version,
            ],
        )?;
        Ok(())
    }

    /// Fetches an entry by ID, scoped to its owner.
    ///
    /// An entry belonging to another user is indistinguishable from a missing
    /// one: both return [`DbError::EntryNotFound`].
    pub fn get_entry(&self, id: &str, user_id: &str) -> Result<TimeEntry, DbError> {
        let raw = self
            .conn
            .query_row(
                &format!("{ENTRY_SELECT} WHERE id = ? AND user_id = ?"),
                params![id, user_id],
                raw_entry_from_row,
            )
            .optional()?;
        match raw {
            Some(raw) => raw.try_into(),
            None => Err(DbError::EntryNotFound { id: id.to_string() }),
        }
    }

    /// Persists an entry's timer sub-structure and derived totals.
    ///
    /// The update is conditional on the version the caller read; zero
    /// affected rows on an existing entry means a concurrent writer won, and
    /// the caller gets [`DbError::WriteConflict`]. On success the stored
    /// version is `entry.version + 1` and is returned.
    pub fn update_entry_timer(&self, entry: &TimeEntry) -> Result<i64, DbError> {
        let updated = self.conn.execute(
            "
            UPDATE time_entries
            SET timer_status = ?,
                started_at = ?,
                last_heartbeat_at = ?,
                accumulated_seconds = ?,
                total_hours = ?,
                hourly_rate = ?,
                total_earnings = ?,
                clock_out = ?,
                version = version + 1
            WHERE id = ? AND user_id = ? AND version = ?
            ",
            params![
                entry.timer.status.as_str(),
                entry.timer.started_at.map(format_timestamp),
                entry.timer.last_heartbeat_at.map(format_timestamp),
                entry.timer.accumulated_seconds,
                entry.total_hours,
                entry.hourly_rate,
                entry.total_earnings,
                entry.clock_out,
                entry.id,
                entry.user_id,
                entry.version,
            ],
        )?;
        if updated == 1 {
            return Ok(entry.version + 1);
        }

        // Distinguish a lost race from a missing entry.
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM time_entries WHERE id = ? AND user_id = ?",
                params![entry.id, entry.user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            tracing::debug!(id = %entry.id, expected = entry.version, "timer update lost a write race");
            Err(DbError::WriteConflict {
                id: entry.id.clone(),
                expected: entry.version,
            })
        } else {
            Err(DbError::EntryNotFound {
                id: entry.id.clone(),
            })
        }
    }

    /// Lists a user's entries, most recent date first.
    pub fn list_entries(&self, user_id: &str) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE user_id = ? ORDER BY entry_date DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], raw_entry_from_row)?;
        collect_entries(rows)
    }

    /// Lists a user's entries whose timer is not stopped.
    pub fn active_entries(&self, user_id: &str) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE user_id = ? AND timer_status != 'stopped' ORDER BY entry_date ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], raw_entry_from_row)?;
        collect_entries(rows)
    }

    /// Lists running entries (any user) whose last heartbeat is older than
    /// `cutoff`. Feeds the abandoned-timer sweep.
    pub fn running_entries_with_heartbeat_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            {ENTRY_SELECT}
            WHERE timer_status = 'running' AND last_heartbeat_at < ?
            ORDER BY last_heartbeat_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(params![format_timestamp(cutoff)], raw_entry_from_row)?;
        collect_entries(rows)
    }

    /// Appends a salary record to a user's history. Returns the row ID.
    pub fn insert_salary_record(
        &self,
        user_id: &str,
        record: &SalaryRecord,
    ) -> Result<i64, DbError> {
        self.conn.execute(
            "
            INSERT INTO salary_records
            (user_id, kind, amount, effective_from, hours_per_day, days_per_month, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                user_id,
                record.kind.as_str(),
                record.amount,
                record.effective_from.to_string(),
                record.working.hours_per_day,
                record.working.days_per_month,
                record.note,
                format_timestamp(record.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists a user's salary history sorted ascending by `effective_from`,
    /// ties broken by insertion order — the order rate resolution expects.
    pub fn list_salary_records(&self, user_id: &str) -> Result<Vec<SalaryRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, kind, amount, effective_from, hours_per_day, days_per_month, note, created_at
            FROM salary_records
            WHERE user_id = ?
            ORDER BY effective_from ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(RawSalaryRecord {
                id: row.get(0)?,
                kind: row.get(1)?,
                amount: row.get(2)?,
                effective_from: row.get(3)?,
                hours_per_day: row.get(4)?,
                days_per_month: row.get(5)?,
                note: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Fetches a user's profile, if one was ever saved.
    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DbError> {
        let profile = self
            .conn
            .query_row(
                "
                SELECT user_id, default_hourly_rate, hours_per_day, days_per_month,
                       overtime_enabled, overtime_threshold_hours, overtime_multiplier
                FROM profiles
                WHERE user_id = ?
                ",
                params![user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get(0)?,
                        default_hourly_rate: row.get(1)?,
                        working: WorkingConfig {
                            hours_per_day: row.get(2)?,
                            days_per_month: row.get(3)?,
                        },
                        overtime: OvertimeConfig {
                            enabled: row.get(4)?,
                            threshold_hours_per_day: row.get(5)?,
                            multiplier: row.get(6)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Creates or replaces a user's profile.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO profiles
            (user_id, default_hourly_rate, hours_per_day, days_per_month,
             overtime_enabled, overtime_threshold_hours, overtime_multiplier)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                default_hourly_rate = excluded.default_hourly_rate,
                hours_per_day = excluded.hours_per_day,
                days_per_month = excluded.days_per_month,
                overtime_enabled = excluded.overtime_enabled,
                overtime_threshold_hours = excluded.overtime_threshold_hours,
                overtime_multiplier = excluded.overtime_multiplier
            ",
            params![
                profile.user_id,
                profile.default_hourly_rate,
                profile.working.hours_per_day,
                profile.working.days_per_month,
                profile.overtime.enabled,
                profile.overtime.threshold_hours_per_day,
                profile.overtime.multiplier,
            ],
        )?;
        Ok(())
    }
}

const ENTRY_SELECT: &str = "
    SELECT id, user_id, entry_date, clock_in, clock_out, break_minutes,
           timer_status, started_at, last_heartbeat_at, accumulated_seconds,
           total_hours, hourly_rate, total_earnings, description, client,
           project, is_leave, leave_type, version
    FROM time_entries
";

/// Formats a timestamp as ISO 8601 with second precision.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Entry row as stored, before string fields are parsed.
struct RawEntry {
    id: String,
    user_id: String,
    entry_date: String,
    clock_in: Option<String>,
    clock_out: Option<String>,
    break_minutes: i64,
    timer_status: String,
    started_at: Option<String>,
    last_heartbeat_at: Option<String>,
    accumulated_seconds: i64,
    total_hours: f64,
    hourly_rate: f64,
    total_earnings: f64,
    description: Option<String>,
    client: Option<String>,
    project: Option<String>,
    is_leave: bool,
    leave_type: Option<String>,
    version: i64,
}

fn raw_entry_from_row(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        entry_date: row.get(2)?,
        clock_in: row.get(3)?,
        clock_out: row.get(4)?,
        break_minutes: row.get(5)?,
        timer_status: row.get(6)?,
        started_at: row.get(7)?,
        last_heartbeat_at: row.get(8)?,
        accumulated_seconds: row.get(9)?,
        total_hours: row.get(10)?,
        hourly_rate: row.get(11)?,
        total_earnings: row.get(12)?,
        description: row.get(13)?,
        client: row.get(14)?,
        project: row.get(15)?,
        is_leave: row.get(16)?,
        leave_type: row.get(17)?,
        version: row.get(18)?,
    })
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<RawEntry>>,
) -> Result<Vec<TimeEntry>, DbError> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.try_into()?);
    }
    Ok(entries)
}

fn parse_timestamp(
    id: &str,
    column: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| DbError::TimestampParse {
                    id: id.to_string(),
                    column,
                    value: v,
                })
        })
        .transpose()
}

impl TryFrom<RawEntry> for TimeEntry {
    type Error = DbError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let entry_date =
            NaiveDate::from_str(&raw.entry_date).map_err(|_| DbError::TimestampParse {
                id: raw.id.clone(),
                column: "entry_date",
                value: raw.entry_date.clone(),
            })?;
        let status =
            TimerStatus::from_str(&raw.timer_status).map_err(|_| DbError::InvalidField {
                id: raw.id.clone(),
                column: "timer_status",
                value: raw.timer_status.clone(),
            })?;
        let started_at = parse_timestamp(&raw.id, "started_at", raw.started_at)?;
        let last_heartbeat_at = parse_timestamp(&raw.id, "last_heartbeat_at", raw.last_heartbeat_at)?;

        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            entry_date,
            clock_in: raw.clock_in,
            clock_out: raw.clock_out,
            break_minutes: raw.break_minutes,
            timer: TimerState {
                status,
                started_at,
                last_heartbeat_at,
                accumulated_seconds: raw.accumulated_seconds,
            },
            total_hours: raw.total_hours,
            hourly_rate: raw.hourly_rate,
            total_earnings: raw.total_earnings,
            description: raw.description,
            client: raw.client,
            project: raw.project,
            is_leave: raw.is_leave,
            leave_type: raw.leave_type,
            version: raw.version,
        })
    }
}

/// Salary row as stored.
struct RawSalaryRecord {
    id: i64,
    kind: String,
    amount: f64,
    effective_from: String,
    hours_per_day: f64,
    days_per_month: f64,
    note: Option<String>,
    created_at: String,
}

impl TryFrom<RawSalaryRecord> for SalaryRecord {
    type Error = DbError;

    fn try_from(raw: RawSalaryRecord) -> Result<Self, Self::Error> {
        let id = raw.id.to_string();
        let kind = SalaryKind::from_str(&raw.kind).map_err(|_| DbError::InvalidField {
            id: id.clone(),
            column: "kind",
            value: raw.kind.clone(),
        })?;
        let effective_from =
            NaiveDate::from_str(&raw.effective_from).map_err(|_| DbError::TimestampParse {
                id: id.clone(),
                column: "effective_from",
                value: raw.effective_from.clone(),
            })?;
        let created_at = DateTime::parse_from_rfc3339(&raw.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| DbError::TimestampParse {
                id: id.clone(),
                column: "created_at",
                value: raw.created_at.clone(),
            })?;

        Ok(Self {
            kind,
            amount: raw.amount,
            effective_from,
            working: WorkingConfig {
                hours_per_day: raw.hours_per_day,
                days_per_month: raw.days_per_month,
            },
            note: raw.note,
            created_at,
        })
    }
}
