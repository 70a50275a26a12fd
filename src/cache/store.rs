//! Cache Store Module
//!
//! Main cache engine: routes keys onto shards, resolves expiration policies
//! and keeps the statistics counters.

use std::collections::hash_map::Entry as Slot;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::stats::Statistics;
use crate::cache::{CacheStats, Entry, Expiration, ShardTable};
use crate::error::{CacheError, Result};
use crate::hash::hash_key;

// == Cache Store ==
/// Sharded cache engine with per-entry expiration.
///
/// Every operation takes `&self`. A key is hashed once and only the lock of
/// the shard owning that hash is taken, so operations on keys that land in
/// different shards never wait on each other.
///
/// The shard table itself sits behind an outer lock that operations hold in
/// shared mode; only [`flush`](Self::flush) takes it exclusively, to swap in
/// a fresh table.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Shard table, replaced wholesale on flush
    table: RwLock<ShardTable<V>>,
    /// Normalized default expiration, None = never
    default_expiration: Option<Duration>,
    /// Number of shards every table is built with
    shard_count: usize,
    /// Operation counters
    stats: Statistics,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `default_expiration` - Lifetime applied for [`Expiration::Default`];
    ///   zero means entries written with the default never expire
    /// * `shard_count` - Number of independently locked shards, at least one
    pub fn new(default_expiration: Duration, shard_count: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be at least 1".to_string(),
            ));
        }

        let default_expiration = Some(default_expiration).filter(|ttl| !ttl.is_zero());
        debug!(?default_expiration, shard_count, "Cache store created");

        Ok(Self {
            table: RwLock::new(ShardTable::new(shard_count)),
            default_expiration,
            shard_count,
            stats: Statistics::new(),
        })
    }

    // == Set ==
    /// Stores a value, overwriting whatever the key held before.
    pub fn set(&self, key: &str, value: V, expiration: Expiration) {
        let expires_at = expiration.deadline(self.default_expiration, Instant::now());
        let hash = hash_key(key);

        let table = self.table.read();
        let previous = table
            .route(hash)
            .write()
            .insert(hash, Entry::new(value, expires_at));
        self.stats.record_set(previous.is_none());
    }

    // == Add ==
    /// Stores a value only if the key holds no live entry.
    ///
    /// The check and the write happen under a single acquisition of the
    /// shard's write lock, so two concurrent adds of the same key cannot
    /// both succeed. An expired entry still present is overwritten.
    ///
    /// # Errors
    /// [`CacheError::AlreadyExists`] if a live entry is present; the stored
    /// value is left unchanged.
    pub fn add(&self, key: &str, value: V, expiration: Expiration) -> Result<()> {
        let now = Instant::now();
        let expires_at = expiration.deadline(self.default_expiration, now);
        let hash = hash_key(key);

        let table = self.table.read();
        let mut entries = table.route(hash).write();
        let previous = match entries.entry(hash) {
            Slot::Occupied(mut slot) => {
                if !slot.get().is_expired_at(now) {
                    return Err(CacheError::AlreadyExists(key.to_string()));
                }
                Some(slot.insert(Entry::new(value, expires_at)))
            }
            Slot::Vacant(slot) => {
                slot.insert(Entry::new(value, expires_at));
                None
            }
        };
        drop(entries);

        self.stats.record_add();
        self.stats.record_set(previous.is_none());
        Ok(())
    }

    // == Replace ==
    /// Stores a value only if the key already holds a live entry.
    ///
    /// Like [`add`](Self::add), the check and the write form one critical
    /// section on the owning shard.
    ///
    /// # Errors
    /// [`CacheError::NotFound`] if the key is absent or its entry expired;
    /// nothing is stored in that case.
    pub fn replace(&self, key: &str, value: V, expiration: Expiration) -> Result<()> {
        let now = Instant::now();
        let expires_at = expiration.deadline(self.default_expiration, now);
        let hash = hash_key(key);

        let table = self.table.read();
        let mut entries = table.route(hash).write();
        match entries.get_mut(&hash) {
            Some(entry) if !entry.is_expired_at(now) => {
                *entry = Entry::new(value, expires_at);
            }
            _ => return Err(CacheError::NotFound(key.to_string())),
        }
        drop(entries);

        self.stats.record_replace();
        self.stats.record_set(false);
        Ok(())
    }

    // == Delete ==
    /// Removes the key, returning the value it held.
    ///
    /// The value is returned even when the entry had already expired but
    /// was not yet reclaimed.
    pub fn delete(&self, key: &str) -> Option<V> {
        let hash = hash_key(key);

        let table = self.table.read();
        let removed = table.route(hash).write().remove(&hash);
        if removed.is_some() {
            self.stats.record_delete();
        }
        drop(table);

        removed.map(|entry| entry.value)
    }

    // == Flush ==
    /// Drops every entry by swapping in a fresh, empty shard table.
    pub fn flush(&self) {
        let fresh = ShardTable::new(self.shard_count);
        let previous = {
            let mut table = self.table.write();
            self.stats.reset_items();
            std::mem::replace(&mut *table, fresh)
        };

        info!(flushed = previous.len(), "Cache flushed");
    }

    // == Item Count ==
    /// Returns the number of stored entries.
    ///
    /// This may include expired entries that have not been reclaimed yet,
    /// and it is not a point-in-time snapshot across shards.
    pub fn item_count(&self) -> usize {
        self.stats.record_item_count();
        self.table.read().len()
    }

    // == Delete Expired ==
    /// Removes every entry whose deadline has passed, returning the count.
    ///
    /// A single "now" is taken before the first shard is visited and used
    /// for the whole sweep. Entries without a deadline are never removed.
    pub fn delete_expired(&self) -> usize {
        let now = Instant::now();

        let table = self.table.read();
        let removed = table.remove_expired(now);
        self.stats.record_expired(removed);
        drop(table);

        debug!(removed, "Expired entries swept");
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// The default expiration, or None if defaulted entries never expire.
    pub fn default_expiration(&self) -> Option<Duration> {
        self.default_expiration
    }
}

impl<V: Clone> CacheStore<V> {
    // == Get ==
    /// Returns a clone of the live value stored under `key`.
    ///
    /// Expired entries read as absent but are left in place for the
    /// janitor, an explicit delete, or a flush to reclaim. Wrap values in
    /// [`std::sync::Arc`] if cloning them is expensive.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let hash = hash_key(key);

        let table = self.table.read();
        let value = table
            .route(hash)
            .read()
            .get(&hash)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone());
        drop(table);

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    const TTL: Duration = Duration::from_secs(300);

    fn store() -> CacheStore<String> {
        CacheStore::new(Duration::ZERO, 10).unwrap()
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.shard_count(), 10);
        assert_eq!(store.default_expiration(), None);
    }

    #[test]
    fn test_store_rejects_zero_shards() {
        let result = CacheStore::<String>::new(TTL, 0);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_store_set_and_get() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::Default);

        assert_eq!(store.get("key1").as_deref(), Some("value1"));
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = store();
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_store_overwrite() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::Default);
        store.set("key1", "value2".to_string(), Expiration::Default);

        assert_eq!(store.get("key1").as_deref(), Some("value2"));
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.stats().items, 1);
        assert_eq!(store.stats().sets, 2);
    }

    #[test]
    fn test_store_expired_entry_is_not_returned_or_removed() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::After(Duration::from_millis(10)));
        assert!(store.get("key1").is_some());

        std::thread::sleep(Duration::from_millis(30));

        assert!(store.get("key1").is_none());
        assert_eq!(store.item_count(), 1, "Reads never reclaim entries");
    }

    #[test]
    fn test_store_default_expiration_applies() {
        let store: CacheStore<u32> = CacheStore::new(Duration::from_millis(10), 4).unwrap();

        store.set("short", 1, Expiration::Default);
        store.set("forever", 2, Expiration::Never);
        std::thread::sleep(Duration::from_millis(30));

        assert!(store.get("short").is_none());
        assert_eq!(store.get("forever"), Some(2));
    }

    #[test]
    fn test_store_add() {
        let store = store();

        assert_ok!(store.add("k", "1".to_string(), Expiration::Default));
        let result = store.add("k", "2".to_string(), Expiration::Default);

        assert_eq!(result, Err(CacheError::AlreadyExists("k".to_string())));
        assert_eq!(store.get("k").as_deref(), Some("1"));
        assert_eq!(store.stats().adds, 1);
    }

    #[test]
    fn test_store_add_over_expired_entry() {
        let store = store();

        store.set("k", "old".to_string(), Expiration::After(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(20));

        assert_ok!(store.add("k", "new".to_string(), Expiration::Never));
        assert_eq!(store.get("k").as_deref(), Some("new"));
        assert_eq!(store.stats().items, 1);
    }

    #[test]
    fn test_store_replace() {
        let store = store();

        assert_err!(store.replace("k", "1".to_string(), Expiration::Default));
        assert!(store.get("k").is_none());

        store.set("k", "1".to_string(), Expiration::Default);
        assert_ok!(store.replace("k", "2".to_string(), Expiration::Default));
        assert_eq!(store.get("k").as_deref(), Some("2"));
        assert_eq!(store.stats().replaces, 1);
        assert_eq!(store.stats().items, 1);
    }

    #[test]
    fn test_store_replace_expired_entry_fails() {
        let store = store();

        store.set("k", "old".to_string(), Expiration::After(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(20));

        let result = store.replace("k", "new".to_string(), Expiration::Never);
        assert_eq!(result, Err(CacheError::NotFound("k".to_string())));
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_store_delete() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::Default);
        assert_eq!(store.delete("key1").as_deref(), Some("value1"));

        assert!(store.get("key1").is_none());
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.stats().deletes, 1);
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let store = store();
        store.set("other", "value".to_string(), Expiration::Default);

        assert!(store.delete("nonexistent").is_none());
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.stats().deletes, 0);
        assert_eq!(store.stats().items, 1);
    }

    #[test]
    fn test_store_flush() {
        let store = store();
        for i in 0..50 {
            store.set(&format!("key{i}"), i.to_string(), Expiration::Default);
        }

        store.flush();

        assert_eq!(store.item_count(), 0);
        assert_eq!(store.stats().items, 0);
        assert!((0..50).all(|i| store.get(&format!("key{i}")).is_none()));
        assert_eq!(store.shard_count(), 10);
    }

    #[test]
    fn test_store_delete_expired() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::After(Duration::from_millis(5)));
        store.set("key2", "value2".to_string(), Expiration::After(Duration::from_secs(10)));
        store.set("key3", "value3".to_string(), Expiration::Never);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.delete_expired(), 1);
        assert_eq!(store.item_count(), 2);
        assert!(store.get("key2").is_some());

        let stats = store.stats();
        assert_eq!(stats.expired_deletes, 1);
        assert_eq!(stats.items, 2);
    }

    #[test]
    fn test_store_stats() {
        let store = store();

        store.set("key1", "value1".to_string(), Expiration::Default);
        store.get("key1");
        store.get("nonexistent");
        store.item_count();

        let stats = store.stats();
        assert_eq!(stats.gets, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.item_count_calls, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_store_locked_shard_does_not_block_other_shards() {
        let store: Arc<CacheStore<u32>> = Arc::new(CacheStore::new(Duration::ZERO, 10).unwrap());
        let blocked = "key0";
        let free = (1..)
            .map(|i| format!("key{i}"))
            .find(|key| hash_key(key) % 10 != hash_key(blocked) % 10)
            .unwrap();

        let table = store.table.read();
        let _shard_guard = table.route(hash_key(blocked)).write();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store.set(&free, 1, Expiration::Never);
                done_tx.send(store.get(&free)).unwrap();
            })
        };

        let result = done_rx.recv_timeout(Duration::from_secs(5));
        assert_eq!(result, Ok(Some(1)), "Writer on another shard must not wait");
        writer.join().unwrap();
    }

    #[test]
    fn test_store_concurrent_add_has_single_winner() {
        let store: Arc<CacheStore<usize>> = Arc::new(CacheStore::new(Duration::ZERO, 10).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.add("contended", i, Expiration::Never).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.item_count(), 1);
    }
}
