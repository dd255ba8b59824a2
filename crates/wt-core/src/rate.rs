//! Effective hourly rate resolution with a bounded in-process cache.
//!
//! # Thread Safety
//!
//! [`RateResolver`] is safe to share across threads; the cache sits behind a
//! `Mutex` and lookups clone the small cached value out. The cache is a pure
//! performance optimization local to one process: it is not invalidated when
//! salary history changes, so staleness is bounded only by the TTL. Callers
//! that mutate salary history should treat cached rates for that user as
//! stale until the TTL expires. In a multi-instance deployment every instance
//! has its own cache; near-term cross-instance staleness is accepted.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::earnings::OvertimeConfig;
use crate::salary::{
    SalaryRecord, WorkingConfig, hourly_from_salary, nearest_record, pick_effective_record,
};

/// How long a cached resolution stays valid, in seconds.
const CACHE_TTL_SECONDS: i64 = 300;

/// Hard cap on cached resolutions.
const CACHE_CAP: usize = 200;

/// How many of the oldest insertions are evicted on overflow.
const CACHE_EVICT_BATCH: usize = 10;

/// Where a resolved rate came from. Anything other than `Effective` means the
/// computation degraded and is worth surfacing to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// A salary record covering the date.
    Effective,
    /// No covering record; fell back to the nearest record by date distance.
    Nearest,
    /// Empty salary history; fell back to the user's flat default rate.
    DefaultRate,
    /// Nothing to fall back to.
    Zero,
}

impl RateSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Effective => "effective",
            Self::Nearest => "nearest",
            Self::DefaultRate => "default_rate",
            Self::Zero => "zero",
        }
    }

    /// True when the rate did not come from a covering salary record.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self, Self::Effective)
    }
}

impl std::fmt::Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hourly rate in force on a date, plus the config snapshots that
/// earnings computation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub hourly_rate: f64,
    pub working: Option<WorkingConfig>,
    pub overtime: Option<OvertimeConfig>,
    pub source: RateSource,
}

#[derive(Debug, Clone)]
struct CacheSlot {
    value: ResolvedRate,
    inserted_at: DateTime<Utc>,
}

/// Bounded map from (user, date) to a resolved rate.
#[derive(Debug, Default)]
struct RateCache {
    entries: HashMap<(String, NaiveDate), CacheSlot>,
}

impl RateCache {
    fn get(&self, key: &(String, NaiveDate), now: DateTime<Utc>) -> Option<ResolvedRate> {
        let slot = self.entries.get(key)?;
        if (now - slot.inserted_at).num_seconds() > CACHE_TTL_SECONDS {
            return None;
        }
        Some(slot.value.clone())
    }

    fn insert(&mut self, key: (String, NaiveDate), value: ResolvedRate, now: DateTime<Utc>) {
        if self.entries.len() >= CACHE_CAP && !self.entries.contains_key(&key) {
            self.evict_oldest(CACHE_EVICT_BATCH);
        }
        self.entries.insert(
            key,
            CacheSlot {
                value,
                inserted_at: now,
            },
        );
    }

    /// Drops the `count` entries with the oldest insertion timestamps.
    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<((String, NaiveDate), DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(k, slot)| (k.clone(), slot.inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
        for (key, _) in by_age.into_iter().take(count) {
            self.entries.remove(&key);
        }
    }
}

/// Resolves the hourly rate in force for a user on a date.
#[derive(Debug, Default)]
pub struct RateResolver {
    cache: Mutex<RateCache>,
}

impl RateResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves at the current time. See [`Self::resolve_at`].
    pub fn resolve(
        &self,
        user_id: &str,
        date: NaiveDate,
        records: &[SalaryRecord],
        default_hourly_rate: Option<f64>,
        overtime: Option<OvertimeConfig>,
    ) -> ResolvedRate {
        self.resolve_at(Utc::now(), user_id, date, records, default_hourly_rate, overtime)
    }

    /// Resolves the rate for `date`, consulting the cache first.
    ///
    /// Resolution chain: effective record, nearest record, the user's flat
    /// default rate, then zero. Degraded outcomes are logged; the caller sees
    /// them in [`ResolvedRate::source`]. `records` must be sorted ascending
    /// by `effective_from`.
    pub fn resolve_at(
        &self,
        now: DateTime<Utc>,
        user_id: &str,
        date: NaiveDate,
        records: &[SalaryRecord],
        default_hourly_rate: Option<f64>,
        overtime: Option<OvertimeConfig>,
    ) -> ResolvedRate {
        let key = (user_id.to_string(), date);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key, now) {
            tracing::trace!(user_id, %date, "rate cache hit");
            return hit;
        }

        let resolved = resolve_uncached(user_id, date, records, default_hourly_rate, overtime);
        cache.insert(key, resolved.clone(), now);
        resolved
    }
}

fn resolve_uncached(
    user_id: &str,
    date: NaiveDate,
    records: &[SalaryRecord],
    default_hourly_rate: Option<f64>,
    overtime: Option<OvertimeConfig>,
) -> ResolvedRate {
    let (record, source) = match pick_effective_record(records, date) {
        Some(record) => (Some(record), RateSource::Effective),
        None => match nearest_record(records, date) {
            Some(record) => (Some(record), RateSource::Nearest),
            None => (None, RateSource::Zero),
        },
    };

    if let Some(record) = record {
        if source.is_degraded() {
            tracing::warn!(
                user_id,
                %date,
                effective_from = %record.effective_from,
                "no salary record covers date; using nearest record"
            );
        }
        return ResolvedRate {
            hourly_rate: hourly_from_salary(record.kind, record.amount, &record.working),
            working: Some(record.working),
            overtime,
            source,
        };
    }

    match default_hourly_rate {
        Some(rate) => {
            tracing::warn!(user_id, %date, rate, "empty salary history; using default rate");
            ResolvedRate {
                hourly_rate: rate,
                working: None,
                overtime,
                source: RateSource::DefaultRate,
            }
        }
        None => {
            tracing::warn!(user_id, %date, "empty salary history and no default rate");
            ResolvedRate {
                hourly_rate: 0.0,
                working: None,
                overtime,
                source: RateSource::Zero,
            }
        }
    }
}
