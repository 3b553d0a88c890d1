//! Integration Tests for the Ring Cache
//!
//! Exercises the public API end to end, including concurrent access from
//! many threads.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use ring_cache::cache::{per_shard_capacity_for, system_time_source};
use ring_cache::{spawn_sweep_task, CacheConfig, CacheError, Lookup, OrderedCache, RingCache};

// == Helper Functions ==

fn manual_clock(start: i64) -> (Arc<AtomicI64>, ring_cache::TimeSource) {
    let clock = Arc::new(AtomicI64::new(start));
    let reader = Arc::clone(&clock);
    (clock, Arc::new(move || reader.load(Ordering::SeqCst)))
}

// == Construction ==

#[test]
fn test_zero_ring_size_is_invalid() {
    let err = RingCache::<u32>::new(0, 5, -1).unwrap_err();
    assert!(matches!(err, CacheError::InvalidConfiguration(_)));
}

// == Size Enforcement ==

#[test]
fn test_single_shard_put_then_enforce_evicts_95() {
    let cache = RingCache::new(1, 5, -1).unwrap();
    let evicted = Arc::new(AtomicUsize::new(0));

    for i in 0..100 {
        let evicted = Arc::clone(&evicted);
        cache.put_with_handler(format!("key {}", i), i, move |_: &str, _: &i32| {
            evicted.fetch_add(1, Ordering::SeqCst);
        });
        cache.enforce_size_limit();
    }

    assert_eq!(evicted.load(Ordering::SeqCst), 95);
    assert_eq!(cache.size(), 5);
}

#[test]
fn test_global_capacity_spread_over_ring() {
    let config = CacheConfig::with_global_capacity(4, 10, -1);
    let cache = RingCache::<usize>::from_config(&config).unwrap();
    assert_eq!(cache.per_shard_capacity(), per_shard_capacity_for(10, 4));

    for i in 0..500 {
        cache.put(format!("key-{}", i), i);
    }
    cache.enforce_size_limit();

    assert!(cache.size() <= 4 * 3);
}

// == Age Expiry ==

#[test]
fn test_expired_key_reports_not_found() {
    let (clock, source) = manual_clock(0);
    let cache = RingCache::new(10, 5, 1).unwrap();
    cache.set_time_source(source);
    let called = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&called);

    cache.put_with_handler("hi", "hellooooo".to_string(), move |key: &str, value: &String| {
        assert_eq!(key, "hi");
        assert_eq!(value, "hellooooo");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    clock.store(2, Ordering::SeqCst);

    let lookup = cache.get("hi");
    assert!(!lookup.found());
    assert_eq!(lookup.payload().map(String::as_str), Some("hellooooo"));
    assert_eq!(called.load(Ordering::SeqCst), 1);

    assert!(!cache.get("hi").found());
    assert_eq!(called.load(Ordering::SeqCst), 1);
}

#[test]
fn test_expiry_with_wall_clock() {
    let cache = RingCache::new(10, 10, 1).unwrap();
    cache.set_time_source(system_time_source());

    cache.put("Hi", "Hi".to_string());
    thread::sleep(Duration::from_millis(10));

    match cache.get("Hi") {
        Lookup::Expired(value) => assert_eq!(value, "Hi"),
        other => panic!("expected expired lookup, got {:?}", other),
    }
}

#[test]
fn test_evict_older_than_fires_handler() {
    let cache = RingCache::new(10, 5, 100).unwrap();
    let called = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&called);

    cache.put_with_handler("hi", "hellooooo".to_string(), move |_: &str, _: &String| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    cache.evict_older_than(ring_cache::cache::current_timestamp_ms() + 1000);

    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(cache.size(), 0);
}

// == Ordering ==

#[test]
fn test_refresh_reorders_eviction() {
    let clock = Arc::new(AtomicI64::new(0));
    let ticker = Arc::clone(&clock);
    let mut cache = OrderedCache::with_time_source(Arc::new(move || {
        ticker.fetch_add(1, Ordering::SeqCst)
    }));

    cache.put("k1", 1);
    cache.put("k2", 2);
    cache.put("k3", 3);

    assert_eq!(cache.evict_oldest().map(|(k, _)| k), Some("k1".to_string()));
    cache.put("k2", 2);
    assert_eq!(cache.evict_oldest().map(|(k, _)| k), Some("k3".to_string()));
}

// == Concurrency ==

#[test]
fn test_concurrent_puts_respect_capacity() {
    let cache = Arc::new(RingCache::new(10, 5, -1).unwrap());

    let handles: Vec<_> = (0..1000)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache.put(format!("key {}", i), i);
                cache.enforce_size_limit();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert!(cache.size() <= 50);
    for index in 0..10 {
        assert!(cache.shard_len(index).unwrap() <= 5);
    }
}

#[test]
fn test_concurrent_mixed_operations() {
    const THREADS: usize = 8;
    const OPS: usize = 2_000;

    let cache = Arc::new(RingCache::new(16, 20, 50).unwrap());
    let evictions = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let evictions = Arc::clone(&evictions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS {
                    let key = format!("key-{}", (i * 7 + t * 13) % 500);
                    match i % 5 {
                        0 | 1 => {
                            let evictions = Arc::clone(&evictions);
                            cache.put_with_handler(key, i, move |_: &str, _: &usize| {
                                evictions.fetch_add(1, Ordering::SeqCst);
                            });
                        }
                        2 | 3 => {
                            cache.get(&key);
                        }
                        _ => {
                            cache.enforce_size_limit();
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    cache.enforce_size_limit();
    let size = cache.size();
    assert!(size <= 16 * 20);

    // Every entry ever created is either still present or was evicted once
    cache.evict_older_than(i64::MAX);
    assert_eq!(cache.size(), 0);
    let stats = cache.stats();
    assert_eq!(stats.evictions as usize, evictions.load(Ordering::SeqCst));
    assert!(stats.hits + stats.misses > 0);
}

#[test]
fn test_concurrent_time_source_swap() {
    let cache = Arc::new(RingCache::new(4, 1000, -1).unwrap());
    let (clock, source) = manual_clock(0);

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..1000 {
                cache.put(format!("key-{}", i), i);
            }
        })
    };
    cache.set_time_source(source);
    writer.join().expect("writer panicked");

    // Anything stamped after the swap carries the manual clock's time
    clock.store(-1, Ordering::SeqCst);
    cache.put("after", 0);
    assert_eq!(cache.evict_older_than(0), 1);
    assert_eq!(cache.get("after"), Lookup::Miss);
}

// == Sweep Task ==

#[tokio::test]
async fn test_sweep_task_bounds_cache() {
    let cache = Arc::new(RingCache::new(4, 2, -1).unwrap());
    for i in 0..100 {
        cache.put(format!("key-{}", i), i);
    }

    let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    assert!(cache.size() <= 8);
}
