//! Sweep Task
//!
//! Background task that periodically expires old entries and trims every
//! shard back to capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RingCache;

/// Spawns a background task that periodically sweeps a ring cache.
///
/// Each pass runs [`RingCache::evict_expired`] and then
/// [`RingCache::enforce_size_limit`]. Shard locks are taken one at a time and
/// never held across an await, so the task only contends with callers
/// touching the shard it is visiting.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RingCache::<String>::new(16, 64, 30_000)?);
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V>(cache: Arc<RingCache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.evict_expired();
            let trimmed = cache.enforce_size_limit();

            if expired + trimmed > 0 {
                info!(
                    "Sweep: expired {} entries, trimmed {} over capacity",
                    expired, trimmed
                );
            } else {
                debug!("Sweep: nothing to evict");
            }
        }
    })
}
