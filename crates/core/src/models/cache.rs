use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload and the moment it was stored.
///
/// Used by both the API response cache and the logo cache. An entry is valid
/// while `now - timestamp < ttl`; nothing is evicted on expiry, stale entries
/// are simply ignored until overwritten or explicitly cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, timestamp: DateTime<Utc>) -> Self {
        Self { payload, timestamp }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.timestamp < ttl
    }
}

/// Counts of entries in a cache, split by freshness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

impl CacheStats {
    /// Tally a set of entries against a TTL.
    pub fn from_entries<'a, T: 'a>(
        entries: impl Iterator<Item = &'a CacheEntry<T>>,
        now: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            stats.total_entries += 1;
            if entry.is_fresh(now, ttl) {
                stats.valid_entries += 1;
            }
        }
        stats.expired_entries = stats.total_entries - stats.valid_entries;
        stats
    }
}
