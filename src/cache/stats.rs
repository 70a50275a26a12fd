//! Cache Statistics Module
//!
//! Tracks per-cache operation counters. Counters are observational only and
//! are read without any lock, so a snapshot may be slightly stale.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently accounted for (expired but unreclaimed ones included)
    pub items: i64,
    /// Successful lookups
    pub gets: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    pub sets: u64,
    pub adds: u64,
    pub replaces: u64,
    /// Explicit deletions that removed an entry
    pub deletes: u64,
    /// Entries reclaimed by the expiration sweep
    pub expired_deletes: u64,
    /// Calls to `item_count`
    pub item_count_calls: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns gets / (gets + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.gets + self.misses;
        if total == 0 {
            0.0
        } else {
            self.gets as f64 / total as f64
        }
    }
}

// == Statistics ==
/// Shared atomic counters owned by a cache.
#[derive(Debug, Default)]
pub(crate) struct Statistics {
    items: AtomicI64,
    gets: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    adds: AtomicU64,
    replaces: AtomicU64,
    deletes: AtomicU64,
    expired_deletes: AtomicU64,
    item_count_calls: AtomicU64,
}

impl Statistics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// `inserted` is true when the write created a new entry rather than
    /// overwriting an existing one.
    pub(crate) fn record_set(&self, inserted: bool) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        if inserted {
            self.items.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn record_add(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replace(&self) {
        self.replaces.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn record_expired(&self, removed: usize) {
        if removed == 0 {
            return;
        }
        self.expired_deletes
            .fetch_add(removed as u64, Ordering::Relaxed);
        self.items.fetch_sub(removed as i64, Ordering::AcqRel);
    }

    pub(crate) fn record_item_count(&self) {
        self.item_count_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_items(&self) {
        self.items.store(0, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            items: self.items.load(Ordering::Acquire),
            gets: self.gets.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            adds: self.adds.load(Ordering::Relaxed),
            replaces: self.replaces.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            expired_deletes: self.expired_deletes.load(Ordering::Relaxed),
            item_count_calls: self.item_count_calls.load(Ordering::Relaxed),
        }
    }
}
