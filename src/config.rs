//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::cache::per_shard_capacity_for;
use crate::error::{CacheError, Result};

/// Cache and soak-runner configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Number of shards in the ring
    pub ring_size: usize,
    /// Maximum entries per shard after size enforcement
    pub per_shard_capacity: usize,
    /// Entry age limit in milliseconds, negative disables expiry
    pub age_limit: i64,
    /// Background sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Number of soak workers
    pub soak_workers: usize,
    /// Distinct keys the soak workers cycle through
    pub soak_key_space: usize,
    /// Seconds between stats reports
    pub stats_interval_secs: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RING_SIZE` - Shard count (default: 16)
    /// - `SHARD_CAPACITY` - Entries per shard (default: 64)
    /// - `AGE_LIMIT_MS` - Entry age limit, -1 disables (default: -1)
    /// - `SWEEP_INTERVAL_MS` - Background sweep frequency (default: 1000)
    /// - `SOAK_WORKERS` - Soak worker count (default: 4)
    /// - `SOAK_KEY_SPACE` - Soak key space (default: 10000)
    /// - `STATS_INTERVAL_SECS` - Stats report frequency (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ring_size: env_or("RING_SIZE", defaults.ring_size),
            per_shard_capacity: env_or("SHARD_CAPACITY", defaults.per_shard_capacity),
            age_limit: env_or("AGE_LIMIT_MS", defaults.age_limit),
            sweep_interval_ms: env_or("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
            soak_workers: env_or("SOAK_WORKERS", defaults.soak_workers),
            soak_key_space: env_or("SOAK_KEY_SPACE", defaults.soak_key_space),
            stats_interval_secs: env_or("STATS_INTERVAL_SECS", defaults.stats_interval_secs),
        }
    }

    /// Creates a config whose per-shard capacity spreads `global_capacity`
    /// over `ring_size` shards, rounding up.
    pub fn with_global_capacity(ring_size: usize, global_capacity: usize, age_limit: i64) -> Self {
        Self {
            ring_size,
            per_shard_capacity: per_shard_capacity_for(global_capacity, ring_size),
            age_limit,
            ..Self::default()
        }
    }

    /// Checks values that would make the cache or sweep task unusable.
    pub fn validate(&self) -> Result<()> {
        if self.ring_size == 0 {
            return Err(CacheError::InvalidConfiguration(
                "RING_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(CacheError::InvalidConfiguration(
                "SWEEP_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ring_size: 16,
            per_shard_capacity: 64,
            age_limit: -1,
            sweep_interval_ms: 1000,
            soak_workers: 4,
            soak_key_space: 10_000,
            stats_interval_secs: 5,
        }
    }
}

/// Parses `name` from the environment, falling back to `default` when it is
/// unset or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ring_size, 16);
        assert_eq!(config.per_shard_capacity, 64);
        assert_eq!(config.age_limit, -1);
        assert_eq!(config.sweep_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("RING_SIZE");
        env::remove_var("SHARD_CAPACITY");
        env::remove_var("AGE_LIMIT_MS");
        env::remove_var("SWEEP_INTERVAL_MS");

        let config = CacheConfig::from_env();
        assert_eq!(config.ring_size, 16);
        assert_eq!(config.per_shard_capacity, 64);
        assert_eq!(config.age_limit, -1);
        assert_eq!(config.sweep_interval_ms, 1000);
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        env::set_var("RING_CACHE_TEST_NUMBER", "42");
        env::set_var("RING_CACHE_TEST_GARBAGE", "forty-two");

        assert_eq!(env_or("RING_CACHE_TEST_NUMBER", 7usize), 42);
        assert_eq!(env_or("RING_CACHE_TEST_GARBAGE", 7usize), 7);
        assert_eq!(env_or("RING_CACHE_TEST_UNSET", -3i64), -3);

        env::remove_var("RING_CACHE_TEST_NUMBER");
        env::remove_var("RING_CACHE_TEST_GARBAGE");
    }

    #[test]
    fn test_with_global_capacity() {
        let config = CacheConfig::with_global_capacity(10, 95, 500);
        assert_eq!(config.ring_size, 10);
        assert_eq!(config.per_shard_capacity, 10);
        assert_eq!(config.age_limit, 500);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = CacheConfig {
            ring_size: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfiguration(_))
        ));

        let config = CacheConfig {
            sweep_interval_ms: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_intervals() {
        let config = CacheConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_millis(1000));
        assert_eq!(config.stats_interval(), Duration::from_secs(5));
    }
}
