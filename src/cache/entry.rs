//! Cache Entry Module
//!
//! Defines individual cache entries and the expiration policies callers pass
//! to write operations.

use std::time::Duration;

use tokio::time::Instant;

// == Expiration ==
/// Expiration policy requested by a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Use the default expiration the cache was constructed with
    #[default]
    Default,
    /// The entry never expires
    Never,
    /// The entry expires this long after it is written.
    /// A zero duration means [`Expiration::Default`].
    After(Duration),
}

impl Expiration {
    // == Resolve ==
    /// Resolves the policy to an absolute deadline relative to `now`.
    ///
    /// `default` is the cache's normalized default; `None` means never.
    /// A deadline too far out to be represented is treated as never.
    pub(crate) fn deadline(self, default: Option<Duration>, now: Instant) -> Option<Instant> {
        let ttl = match self {
            Expiration::Default => default,
            Expiration::After(ttl) if ttl.is_zero() => default,
            Expiration::Never => None,
            Expiration::After(ttl) => Some(ttl),
        };

        ttl.and_then(|ttl| now.checked_add(ttl))
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiration::Default
        } else {
            Expiration::After(ttl)
        }
    }
}

// == Cache Entry ==
/// A stored value together with its absolute expiration instant.
///
/// Entries are never mutated in place: every write replaces the whole entry.
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    /// The stored value, opaque to the cache
    pub(crate) value: V,
    /// Expiration instant, None = no expiration
    pub(crate) expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks whether the entry had expired at `now`.
    ///
    /// An entry is expired only once `now` is strictly past its deadline.
    /// Entries without a deadline never expire.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }
}
