//! Ring Cache Module
//!
//! Thread-safe cache made of independently locked [`OrderedCache`] shards
//! arranged in a ring.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cache::entry::{system_time_source, TimeSource};
use crate::cache::router::{default_router, KeyRouter};
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::cache::OrderedCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Lookup ==
/// Outcome of [`RingCache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// The key is present and within the age limit
    Hit(V),
    /// The key was present but past the age limit; it has been evicted and
    /// its last payload is handed back for information only
    Expired(V),
    /// The key is not present
    Miss,
}

impl<V> Lookup<V> {
    /// True only for [`Lookup::Hit`].
    pub fn found(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// The payload of a hit or an expired entry.
    pub fn payload(&self) -> Option<&V> {
        match self {
            Lookup::Hit(value) | Lookup::Expired(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    /// Consumes the lookup, returning the payload of a hit or an expired
    /// entry.
    pub fn into_payload(self) -> Option<V> {
        match self {
            Lookup::Hit(value) | Lookup::Expired(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    /// Consumes the lookup, returning the payload only if it was a hit.
    pub fn into_hit(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

// == Ring Cache ==
/// A cache partitioned over a fixed ring of shards.
///
/// Each key routes to exactly one shard, and operations on a key lock only
/// that shard. Whole-ring operations ([`enforce_size_limit`],
/// [`evict_older_than`], [`set_time_source`], [`size`]) visit shards in index
/// order, holding one shard lock at a time; they are atomic per shard only.
///
/// Capacity is not enforced on put. Callers mutate, then call
/// [`enforce_size_limit`] (or run [`spawn_sweep_task`]).
///
/// Eviction handlers run while their shard is write-locked and must not call
/// back into the same cache.
///
/// [`enforce_size_limit`]: Self::enforce_size_limit
/// [`evict_older_than`]: Self::evict_older_than
/// [`set_time_source`]: Self::set_time_source
/// [`size`]: Self::size
/// [`spawn_sweep_task`]: crate::tasks::spawn_sweep_task
pub struct RingCache<V> {
    shards: Vec<RwLock<OrderedCache<V>>>,
    router: KeyRouter,
    per_shard_capacity: usize,
    /// None when age expiry is disabled
    age_limit: Option<i64>,
    stats: CacheStats,
}

impl<V> RingCache<V> {
    // == Constructors ==
    /// Creates a ring of `ring_size` shards, each holding at most
    /// `per_shard_capacity` entries after size enforcement.
    ///
    /// A negative `age_limit` disables age expiry. Otherwise entries older
    /// than `age_limit` time units (milliseconds with the default clock)
    /// read as expired.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfiguration`] if `ring_size` is zero.
    pub fn new(ring_size: usize, per_shard_capacity: usize, age_limit: i64) -> Result<Self> {
        Self::with_router(ring_size, per_shard_capacity, age_limit, default_router())
    }

    /// Like [`new`](Self::new), with a caller-supplied key router.
    pub fn with_router(
        ring_size: usize,
        per_shard_capacity: usize,
        age_limit: i64,
        router: KeyRouter,
    ) -> Result<Self> {
        if ring_size == 0 {
            return Err(CacheError::InvalidConfiguration(
                "ring size must be greater than zero".to_string(),
            ));
        }

        let time_source = system_time_source();
        let shards = (0..ring_size)
            .map(|_| RwLock::new(OrderedCache::with_time_source(Arc::clone(&time_source))))
            .collect();

        debug!(
            "Ring cache created: ring_size={}, per_shard_capacity={}, age_limit={}",
            ring_size, per_shard_capacity, age_limit
        );

        Ok(Self {
            shards,
            router,
            per_shard_capacity,
            age_limit: (age_limit >= 0).then_some(age_limit),
            stats: CacheStats::new(),
        })
    }

    /// Creates a ring from validated configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.ring_size, config.per_shard_capacity, config.age_limit)
    }

    // == Accessors ==
    pub fn ring_size(&self) -> usize {
        self.shards.len()
    }

    pub fn per_shard_capacity(&self) -> usize {
        self.per_shard_capacity
    }

    /// The age limit, or None when expiry is disabled.
    pub fn age_limit(&self) -> Option<i64> {
        self.age_limit
    }

    /// The shard index `key` routes to.
    pub fn shard_for(&self, key: &str) -> usize {
        let index = (self.router)(key, self.shards.len());
        assert!(
            index < self.shards.len(),
            "router returned {index} for a ring of {}",
            self.shards.len()
        );
        index
    }

    fn shard(&self, key: &str) -> &RwLock<OrderedCache<V>> {
        &self.shards[self.shard_for(key)]
    }

    // == Put ==
    /// Inserts or refreshes `key`. Returns the previous payload, if any.
    pub fn put(&self, key: impl Into<String>, payload: V) -> Option<V> {
        let key = key.into();
        self.shard(&key).write().put(key, payload)
    }

    /// Inserts or refreshes `key`, attaching `handler` to be fired once when
    /// the entry is evicted or removed. A refresh never fires a handler and
    /// keeps the one already attached, if any.
    pub fn put_with_handler<F>(&self, key: impl Into<String>, payload: V, handler: F) -> Option<V>
    where
        F: FnOnce(&str, &V) + Send + Sync + 'static,
    {
        let key = key.into();
        self.shard(&key).write().put_with_handler(key, payload, handler)
    }

    // == Get ==
    /// Looks up `key`.
    ///
    /// A live entry is read under the shard's shared lock. An entry past the
    /// age limit is handled under the exclusive lock: the shard is swept of
    /// everything expired, and the stale payload comes back as
    /// [`Lookup::Expired`].
    pub fn get(&self, key: &str) -> Lookup<V>
    where
        V: Clone,
    {
        let shard = self.shard(key);

        {
            let cache = shard.read();
            match cache.get(key) {
                None => {
                    self.stats.record_miss();
                    return Lookup::Miss;
                }
                Some((payload, order_time)) if !self.is_expired(cache.now(), order_time) => {
                    self.stats.record_hit();
                    return Lookup::Hit(payload.clone());
                }
                Some(_) => {}
            }
        }

        // Expiry evicts, so re-check under the write lock. The entry may have
        // been refreshed or removed in between.
        // The clock is read once so the expiry decision and the sweep cutoff
        // agree even if the time source steps backward.
        let mut cache = shard.write();
        let now = cache.now();
        let stale = match cache.get(key) {
            None => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
            Some((payload, order_time)) if !self.is_expired(now, order_time) => {
                self.stats.record_hit();
                return Lookup::Hit(payload.clone());
            }
            Some((payload, _)) => payload.clone(),
        };

        let evicted = self.sweep_expired(&mut cache, now);
        debug_assert!(!cache.contains_key(key), "expired key survived its sweep");
        drop(cache);

        trace!("Key {} expired on read, swept {} entries", key, evicted);
        self.stats.record_miss();
        Lookup::Expired(stale)
    }

    // == Remove ==
    /// Removes `key`, firing its handler. Returns the removed payload.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.shard(key).write().remove(key)
    }

    // == Enforce Size Limit ==
    /// Evicts oldest-first from every shard until each holds at most
    /// `per_shard_capacity` entries. Returns the number evicted.
    pub fn enforce_size_limit(&self) -> usize {
        let mut evicted = 0;

        for shard in &self.shards {
            let mut cache = shard.write();
            while cache.len() > self.per_shard_capacity {
                if cache.evict_oldest().is_none() {
                    break;
                }
                evicted += 1;
            }
        }

        self.stats.record_evictions(evicted);
        if evicted > 0 {
            debug!("Size limit: evicted {} entries", evicted);
        }
        evicted
    }

    // == Evict Older Than ==
    /// Evicts every entry in every shard whose order time is below `cutoff`.
    /// Returns the number evicted.
    pub fn evict_older_than(&self, cutoff: i64) -> usize {
        let evicted = self
            .shards
            .iter()
            .map(|shard| shard.write().evict_older_than(cutoff))
            .sum();

        self.stats.record_evictions(evicted);
        if evicted > 0 {
            debug!("Age sweep: evicted {} entries older than {}", evicted, cutoff);
        }
        evicted
    }

    // == Evict Expired ==
    /// Evicts everything past the age limit, judged by each shard's own
    /// clock. Does nothing when expiry is disabled.
    pub fn evict_expired(&self) -> usize {
        if self.age_limit.is_none() {
            return 0;
        }

        let evicted = self
            .shards
            .iter()
            .map(|shard| {
                let mut cache = shard.write();
                let now = cache.now();
                self.sweep_expired(&mut cache, now)
            })
            .sum();

        if evicted > 0 {
            debug!("Expiry sweep: evicted {} entries", evicted);
        }
        evicted
    }

    // == Set Time Source ==
    /// Installs `time_source` in every shard. Affects order times stamped
    /// from now on.
    pub fn set_time_source(&self, time_source: TimeSource) {
        for shard in &self.shards {
            shard.write().set_time_source(Arc::clone(&time_source));
        }
    }

    // == Size ==
    /// Total entries across all shards.
    ///
    /// Each shard is read under its own lock, so the total is approximate
    /// while other threads mutate the cache.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Entries in one shard, or None if `index` is outside the ring.
    pub fn shard_len(&self, index: usize) -> Option<usize> {
        self.shards.get(index).map(|shard| shard.read().len())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.size())
    }

    /// Zeroes the hit, miss and eviction counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // == Expiry Helpers ==
    fn is_expired(&self, now: i64, order_time: i64) -> bool {
        match self.age_limit {
            Some(limit) => now.saturating_sub(order_time) > limit,
            None => false,
        }
    }

    /// Evicts entries of one write-locked shard that are past the age limit
    /// as of `now`.
    fn sweep_expired(&self, cache: &mut OrderedCache<V>, now: i64) -> usize {
        let Some(limit) = self.age_limit else {
            return 0;
        };
        let evicted = cache.evict_older_than(now.saturating_sub(limit));
        self.stats.record_evictions(evicted);
        evicted
    }
}

impl<V> fmt::Debug for RingCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingCache")
            .field("ring_size", &self.shards.len())
            .field("per_shard_capacity", &self.per_shard_capacity)
            .field("age_limit", &self.age_limit)
            .finish()
    }
}
