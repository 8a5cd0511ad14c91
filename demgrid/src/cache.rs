//! Result cache for resolved elevations.
//!
//! Lookups are keyed by the coordinate rounded to [`KEY_PRECISION`] decimal
//! places, so two coordinates that only differ past the fourth decimal share
//! one entry and one answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;

/// Number of decimal places kept in cache keys.
pub const KEY_PRECISION: usize = 4;

/// Default maximum number of cached results.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_000_000;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of results currently in the cache.
    pub entry_count: u64,
    /// Number of lookups answered from the cache.
    pub hit_count: u64,
    /// Number of lookups that had to read the grid.
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Build the canonical cache key for a coordinate.
pub fn cache_key(lat: f64, lon: f64) -> String {
    format!("{:.*},{:.*}", KEY_PRECISION, lat, KEY_PRECISION, lon)
}

/// Bounded, thread-safe cache of elevations in meters.
///
/// Entries are evicted once `capacity` is reached and, if a TTL is set,
/// expire after it. Concurrent inserts of the same key are harmless since
/// the value for a key never changes.
pub struct ResultCache {
    entries: Cache<String, f64>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results.
    pub fn new(capacity: u64) -> Self {
        Self::with_ttl(capacity, None)
    }

    /// Create a cache with an optional time-to-live per entry.
    pub fn with_ttl(capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            entries: builder.build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Look up a key, recording a hit or a miss.
    pub fn get(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(value) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a resolved elevation.
    pub fn insert(&self, key: String, elevation: f64) {
        self.entries.insert(key, elevation);
    }

    /// Get cache statistics.
    ///
    /// Pending inserts and evictions are applied first so `entry_count`
    /// reflects every completed `insert`.
    pub fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        CacheStats {
            entry_count: self.entries.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> u64 {
        self.entries.policy().max_capacity().unwrap_or(0)
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rounds_to_four_decimals() {
        assert_eq!(cache_key(35.6812, 139.7671), "35.6812,139.7671");
        assert_eq!(cache_key(35.0, 139.0), "35.0000,139.0000");
        assert_eq!(cache_key(35.681_249, 139.767_09), "35.6812,139.7671");
        assert_eq!(cache_key(35.68126, 139.7671), "35.6813,139.7671");
    }

    #[test]
    fn test_nearby_coordinates_share_a_key() {
        assert_eq!(cache_key(35.36061, 138.72741), cache_key(35.36059, 138.72739));
        assert_ne!(cache_key(35.3606, 138.7274), cache_key(35.3607, 138.7274));
    }

    #[test]
    fn test_hit_and_miss_counts() {
        let cache = ResultCache::new(10);

        assert_eq!(cache.get("35.0000,139.0000"), None);
        cache.insert("35.0000,139.0000".to_string(), 12.5);
        assert_eq!(cache.get("35.0000,139.0000"), Some(12.5));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_entry_count_includes_recent_inserts() {
        let cache = ResultCache::new(100);
        for i in 0..3 {
            cache.insert(cache_key(35.0 + f64::from(i) * 0.1, 139.0), 1.0);
        }

        assert_eq!(cache.stats().entry_count, 3);
    }

    #[test]
    fn test_hit_rate_without_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_capacity_and_clear() {
        let cache = ResultCache::with_ttl(42, Some(Duration::from_secs(60)));
        assert_eq!(cache.capacity(), 42);

        cache.insert(cache_key(35.0, 139.0), 1.0);
        cache.clear();
        assert_eq!(cache.get(&cache_key(35.0, 139.0)), None);
    }
}
