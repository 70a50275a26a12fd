//! Shardcache - An in-process sharded key-value cache
//!
//! Provides lock-partitioned storage with per-entry expiration and a
//! background janitor that reclaims expired entries.

pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod tasks;

pub use cache::{Cache, CacheStats, CacheStore, Expiration};
pub use config::Config;
pub use error::{CacheError, Result};
