//! Shard Module
//!
//! Independently locked partitions of the key space and the fixed table that
//! routes hashed keys onto them.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::Instant;

use crate::cache::Entry;

/// Number of shards a cache is built with unless configured otherwise.
pub const DEFAULT_SHARD_COUNT: usize = 10;

// == Shard ==
/// One partition of the key space, guarded by its own reader/writer lock.
#[derive(Debug)]
pub(crate) struct Shard<V> {
    entries: RwLock<HashMap<u64, Entry<V>>>,
}

impl<V> Shard<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, Entry<V>>> {
        self.entries.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, Entry<V>>> {
        self.entries.write()
    }

    /// Number of entries held right now, expired ones included.
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    // == Remove Expired ==
    /// Removes every entry that had expired at `now`, returning how many went.
    fn remove_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }
}

// == Shard Table ==
/// Fixed-size sequence of shards. The shard count never changes once built.
#[derive(Debug)]
pub(crate) struct ShardTable<V> {
    shards: Box<[Shard<V>]>,
}

impl<V> ShardTable<V> {
    /// Allocates `shard_count` empty shards. The store rejects a zero count
    /// before building a table.
    pub(crate) fn new(shard_count: usize) -> Self {
        debug_assert!(shard_count > 0, "shard table needs at least one shard");
        Self {
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
        }
    }

    // == Route ==
    /// Returns the shard owning `hash`. No lock is taken here.
    #[inline]
    pub(crate) fn route(&self, hash: u64) -> &Shard<V> {
        // The table is never empty, and the remainder always fits a usize.
        &self.shards[(hash % self.shards.len() as u64) as usize]
    }

    // == Size ==
    /// Sums the entry counts of all shards, one read lock at a time.
    ///
    /// Not a point-in-time snapshot: shards not yet visited may change while
    /// earlier ones are counted.
    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    // == Sweep ==
    /// Removes entries that had expired at `now`, shard by shard.
    ///
    /// Only one shard lock is held at a time, so readers of other shards are
    /// never blocked by the sweep.
    pub(crate) fn remove_expired(&self, now: Instant) -> usize {
        self.shards.iter().map(|shard| shard.remove_expired(now)).sum()
    }
}
