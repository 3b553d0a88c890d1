//! Shard Router Module
//!
//! Maps keys onto ring slots.

use std::sync::Arc;

/// Maps a key to a shard index in `[0, ring_size)`.
///
/// Must be deterministic: a key has to land on the same shard for the
/// lifetime of a cache.
pub type KeyRouter = Arc<dyn Fn(&str, usize) -> usize + Send + Sync>;

/// Route a key to a shard index using CRC-32 (IEEE).
///
/// Single-shard rings always return 0.
pub fn crc32_route(key: &str, ring_size: usize) -> usize {
    if ring_size <= 1 {
        return 0;
    }
    (crc32fast::hash(key.as_bytes()) as usize) % ring_size
}

/// Route a key to a shard index using 64-bit FNV-1a.
pub fn fnv1a_route(key: &str, ring_size: usize) -> usize {
    if ring_size <= 1 {
        return 0;
    }
    (fnv1a(key.as_bytes()) % ring_size as u64) as usize
}

/// The router installed when a cache is built without one.
pub fn default_router() -> KeyRouter {
    Arc::new(crc32_route)
}

fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
