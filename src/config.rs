//! Configuration Module
//!
//! Handles loading cache and soak-driver settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_SHARD_COUNT;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default expiration in seconds, 0 = entries never expire by default
    pub default_expiration_secs: u64,
    /// Janitor sweep interval in milliseconds, 0 = no janitor
    pub cleanup_interval_ms: u64,
    /// Number of independently locked shards
    pub shard_count: usize,
    /// Concurrent workers run by the soak driver
    pub soak_workers: usize,
    /// Distinct keys the soak driver cycles through
    pub soak_keys: usize,
    /// Soak run length in seconds, 0 = until interrupted
    pub soak_seconds: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_EXPIRATION` - Default expiration in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Janitor interval in milliseconds (default: 1000)
    /// - `SHARD_COUNT` - Number of shards (default: 10)
    /// - `SOAK_WORKERS` - Soak driver workers (default: 4)
    /// - `SOAK_KEYS` - Soak driver key space (default: 1000)
    /// - `SOAK_SECONDS` - Soak run length (default: 0)
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_expiration_secs: env_or("DEFAULT_EXPIRATION", defaults.default_expiration_secs),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval_ms),
            shard_count: env_or("SHARD_COUNT", defaults.shard_count),
            soak_workers: env_or("SOAK_WORKERS", defaults.soak_workers),
            soak_keys: env_or("SOAK_KEYS", defaults.soak_keys),
            soak_seconds: env_or("SOAK_SECONDS", defaults.soak_seconds),
        }
    }

    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_expiration_secs: 300,
            cleanup_interval_ms: 1000,
            shard_count: DEFAULT_SHARD_COUNT,
            soak_workers: 4,
            soak_keys: 1000,
            soak_seconds: 0,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
