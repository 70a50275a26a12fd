//! Cache Handle Module
//!
//! The owning handle given to callers. It pairs the shared store with the
//! janitor sweeping it, and stops the janitor when it goes away.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{CacheStore, DEFAULT_SHARD_COUNT};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::{Janitor, JanitorState};

// == Cache ==
/// Owning handle to a sharded cache.
///
/// All cache operations are reachable through [`Deref`] to [`CacheStore`].
/// Share the handle across threads or tasks by wrapping it in an [`Arc`];
/// the janitor is stopped when the last reference is dropped, or earlier
/// through [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct Cache<V> {
    store: Arc<CacheStore<V>>,
    janitor: Option<Janitor>,
}

impl<V> Cache<V>
where
    V: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache with the default number of shards.
    ///
    /// # Arguments
    /// * `default_expiration` - Lifetime of entries written with
    ///   [`Expiration::Default`](crate::cache::Expiration::Default); zero
    ///   means they never expire
    /// * `cleanup_interval` - Period of the background sweep; zero disables
    ///   the janitor, leaving expired entries in place until deleted,
    ///   flushed or swept with [`CacheStore::delete_expired`]
    ///
    /// # Errors
    /// [`CacheError::NoRuntime`](crate::CacheError::NoRuntime) if a cleanup
    /// interval is given outside of a Tokio runtime.
    pub fn new(default_expiration: Duration, cleanup_interval: Duration) -> Result<Self> {
        Self::with_shards(default_expiration, cleanup_interval, DEFAULT_SHARD_COUNT)
    }

    /// Creates a cache split into `shard_count` shards.
    pub fn with_shards(
        default_expiration: Duration,
        cleanup_interval: Duration,
        shard_count: usize,
    ) -> Result<Self> {
        let store = Arc::new(CacheStore::new(default_expiration, shard_count)?);

        let janitor = if cleanup_interval.is_zero() {
            None
        } else {
            let mut janitor = Janitor::new(cleanup_interval);
            janitor.start(&store)?;
            Some(janitor)
        };

        Ok(Self { store, janitor })
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_shards(
            config.default_expiration(),
            config.cleanup_interval(),
            config.shard_count,
        )
    }
}

impl<V> Cache<V> {
    // == Shutdown ==
    /// Stops the janitor, if any. Safe to call more than once.
    ///
    /// The cache stays usable afterwards; expired entries are simply no
    /// longer reclaimed in the background.
    pub fn shutdown(&mut self) {
        if let Some(janitor) = self.janitor.as_mut() {
            if janitor.state() == JanitorState::Running {
                janitor.stop();
                info!("Cache shut down");
            }
        }
    }

    /// Returns the janitor's state, or None if the cache was built without one.
    pub fn janitor_state(&self) -> Option<JanitorState> {
        self.janitor.as_ref().map(Janitor::state)
    }
}

impl<V> Deref for Cache<V> {
    type Target = CacheStore<V>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiration;
    use crate::error::CacheError;

    #[test]
    fn test_cache_without_janitor_needs_no_runtime() {
        let cache: Cache<u32> = Cache::new(Duration::ZERO, Duration::ZERO).unwrap();

        cache.set("a", 1, Expiration::Default);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.janitor_state(), None);
        assert_eq!(cache.shard_count(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_cache_with_janitor_outside_runtime_fails() {
        let result = Cache::<u32>::new(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_cache_shutdown_is_idempotent() {
        let mut cache: Cache<u32> = Cache::new(Duration::ZERO, Duration::from_secs(1)).unwrap();
        assert_eq!(cache.janitor_state(), Some(JanitorState::Running));

        cache.shutdown();
        cache.shutdown();
        assert_eq!(cache.janitor_state(), Some(JanitorState::Stopped));

        cache.set("still", 7, Expiration::Never);
        assert_eq!(cache.get("still"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_cache_stops_janitor() {
        let cache: Cache<u32> = Cache::new(Duration::ZERO, Duration::from_secs(1)).unwrap();
        // A strong reference outliving the handle: only the stop signal can end the task.
        let store = Arc::clone(&cache.store);
        assert_eq!(Arc::weak_count(&store), 1, "Janitor holds a weak reference");

        drop(cache);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(Arc::weak_count(&store), 0, "Janitor task must exit on drop");
        store.set("k", 1, Expiration::After(Duration::from_millis(1)));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.item_count(), 1, "No sweeps after the handle is gone");
    }

    #[test]
    fn test_cache_from_config() {
        let config = Config {
            default_expiration_secs: 0,
            cleanup_interval_ms: 0,
            shard_count: 3,
            ..Config::default()
        };
        let cache: Cache<String> = Cache::from_config(&config).unwrap();

        assert_eq!(cache.shard_count(), 3);
        assert_eq!(cache.default_expiration(), None);
    }
}
