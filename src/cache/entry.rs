//! Cache Entry Module
//!
//! Defines a single heap entry, its eviction handler and the time source
//! used to stamp entries.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

// == Type Aliases ==
/// Callback fired with the key and payload when an entry is evicted.
///
/// Stored as `FnOnce`, so it can run at most once per entry.
pub type EvictionHandler<V> = Box<dyn FnOnce(&str, &V) + Send + Sync>;

/// Produces the order time stamped on inserted or refreshed entries.
///
/// Smaller values are evicted first. The values need not be wall-clock
/// time, but they should be non-decreasing for age limits to be meaningful.
pub type TimeSource = Arc<dyn Fn() -> i64 + Send + Sync>;

// == Entry ==
/// A single keyed payload stored in an [`OrderedCache`](super::OrderedCache).
pub(crate) struct Entry<V> {
    pub(crate) key: String,
    pub(crate) payload: V,
    pub(crate) order_time: i64,
    pub(crate) on_evict: Option<EvictionHandler<V>>,
}

impl<V> Entry<V> {
    pub(crate) fn new(
        key: String,
        payload: V,
        order_time: i64,
        on_evict: Option<EvictionHandler<V>>,
    ) -> Self {
        Self {
            key,
            payload,
            order_time,
            on_evict,
        }
    }

    // == Evict ==
    /// Consumes the entry, firing its handler (if any) before handing back
    /// the key and payload.
    pub(crate) fn evict(mut self) -> (String, V) {
        if let Some(handler) = self.on_evict.take() {
            handler(&self.key, &self.payload);
        }
        (self.key, self.payload)
    }
}

impl<V: fmt::Debug> fmt::Debug for Entry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("payload", &self.payload)
            .field("order_time", &self.order_time)
            .field("has_handler", &self.on_evict.is_some())
            .finish()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The default wall-clock time source, in milliseconds since the Unix epoch.
pub fn system_time_source() -> TimeSource {
    Arc::new(current_timestamp_ms)
}
