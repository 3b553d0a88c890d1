//! Ring Cache - A sharded in-process key/value cache
//!
//! Keys are routed onto a fixed ring of independently locked shards. Each
//! shard orders its entries in a min-heap by insertion/refresh time, so
//! oldest-first eviction and age-based expiry are cheap.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Lookup, OrderedCache, RingCache, TimeSource};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
