//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free counters shared by every shard of a ring.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Evictions ==
    /// Adds `count` to the eviction counter.
    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads the counters. Each load is independent, so under concurrent
    /// updates the snapshot is approximate.
    pub fn snapshot(&self, total_entries: usize) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Number of lookups that found a live entry
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry
    pub misses: u64,
    /// Number of entries removed by size or age eviction
    pub evictions: u64,
    /// Entries across all shards when the snapshot was taken
    pub total_entries: usize,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
