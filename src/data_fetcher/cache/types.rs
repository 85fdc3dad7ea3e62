//! Cache data structures with TTL support

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// A cached payload together with the moment it was stored and its lifetime.
///
/// `stored_at + ttl_seconds` is the absolute expiry. Entries are replaced
/// whole on refresh and are never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Creates a new entry stored at `stored_at`
    pub fn new(key: impl Into<String>, payload: Value, ttl_seconds: u64, stored_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            payload,
            stored_at,
            ttl_seconds,
        }
    }

    /// Absolute expiry of the entry
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        Duration::try_seconds(ttl)
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Valid iff `now` is strictly before the expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let valid = now < self.expires_at();
        trace!(
            "Cache validity check: key={}, stored_at={}, ttl={}s, valid={}",
            self.key, self.stored_at, self.ttl_seconds, valid
        );
        valid
    }

    /// Gets the remaining time until expiration
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).max(Duration::zero())
    }
}

/// Entry counts of a cache store at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

impl CacheStats {
    /// Tallies entries against `now`
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>, now: DateTime<Utc>) -> Self {
        entries.into_iter().fold(CacheStats::default(), |mut stats, entry| {
            stats.total += 1;
            if entry.is_valid_at(now) {
                stats.valid += 1;
            } else {
                stats.expired += 1;
            }
            stats
        })
    }
}
