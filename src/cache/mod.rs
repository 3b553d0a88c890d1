//! Cache Module
//!
//! Provides the single-threaded ordered cache and the sharded ring built on
//! top of it.

mod entry;
mod ordered;
mod ring;
pub mod router;
mod stats;


// Re-export public types
pub use entry::{current_timestamp_ms, system_time_source, EvictionHandler, TimeSource};
pub use ordered::OrderedCache;
pub use ring::{Lookup, RingCache};
pub use router::{crc32_route, fnv1a_route, KeyRouter};
pub use stats::{CacheStats, StatsSnapshot};

// == Public Functions ==
/// Per-shard capacity that spreads a single global cap over `ring_size`
/// shards, rounding up.
///
/// Returns 0 when `ring_size` is 0.
pub fn per_shard_capacity_for(global_capacity: usize, ring_size: usize) -> usize {
    if ring_size == 0 {
        return 0;
    }
    global_capacity.div_ceil(ring_size)
}
