//! Ring Cache soak runner
//!
//! Drives a ring cache with concurrent put/get workers while the background
//! sweep task keeps it bounded, reporting statistics until shut down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ring_cache::{spawn_sweep_task, CacheConfig, RingCache};

/// Operations a worker runs between yields to the scheduler.
const WORKER_BATCH: usize = 256;

/// Main entry point for the soak runner.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the ring cache
/// 4. Start the background sweep task
/// 5. Start workers and the stats reporter
/// 6. Stop everything on SIGINT/SIGTERM and print final stats
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ring_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ring Cache soak runner");

    let config = CacheConfig::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: ring_size={}, per_shard_capacity={}, age_limit={}ms, sweep_interval={}ms, workers={}",
        config.ring_size,
        config.per_shard_capacity,
        config.age_limit,
        config.sweep_interval_ms,
        config.soak_workers
    );

    let cache = Arc::new(RingCache::<String>::from_config(&config)?);
    info!("Ring cache initialized");

    let mut handles = vec![spawn_sweep_task(cache.clone(), config.sweep_interval())];
    info!("Background sweep task started");

    for worker in 0..config.soak_workers {
        handles.push(tokio::spawn(run_worker(
            cache.clone(),
            worker,
            config.soak_key_space.max(1),
        )));
    }
    handles.push(spawn_stats_reporter(cache.clone(), config.stats_interval()));

    shutdown_signal().await;

    for handle in &handles {
        handle.abort();
    }
    warn!("Workers and background tasks aborted");

    let stats = cache.stats();
    info!(
        "Final stats: {} (hit rate {:.3})",
        serde_json::to_string(&stats)?,
        stats.hit_rate()
    );

    Ok(())
}

/// Mixes puts and gets over a cycling key space, one put per four operations.
async fn run_worker(cache: Arc<RingCache<String>>, worker: usize, key_space: usize) {
    let mut op: usize = 0;
    loop {
        for _ in 0..WORKER_BATCH {
            let key = format!("key-{}", op.wrapping_mul(31).wrapping_add(worker) % key_space);
            if op % 4 == 0 {
                cache.put(key, format!("worker {} op {}", worker, op));
            } else {
                cache.get(&key);
            }
            op = op.wrapping_add(1);
        }
        tokio::task::yield_now().await;
    }
}

/// Logs a stats snapshot every `interval`.
fn spawn_stats_reporter(cache: Arc<RingCache<String>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let stats = cache.stats();
            match serde_json::to_string(&stats) {
                Ok(json) => info!("Stats: {} (hit rate {:.3})", json, stats.hit_rate()),
                Err(err) => warn!("Failed to serialize stats: {}", err),
            }
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
