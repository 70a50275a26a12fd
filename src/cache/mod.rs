//! Cache Module
//!
//! Provides a sharded in-memory cache with per-entry expiration.

mod entry;
mod handle;
mod shard;
mod stats;
mod store;


// Re-export public types
pub(crate) use entry::Entry;
pub use entry::Expiration;
pub use handle::Cache;
pub(crate) use shard::ShardTable;
pub use shard::DEFAULT_SHARD_COUNT;
pub use stats::CacheStats;
pub use store::CacheStore;
