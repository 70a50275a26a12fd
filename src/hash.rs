//! Key Hashing
//!
//! Maps string keys onto the 64-bit space used for shard routing.

use std::hash::Hasher;

use fnv::FnvHasher;

/// Hashes a key with 64-bit FNV-1a.
///
/// Every call starts from a fresh hasher, so concurrent callers never share
/// a running hash state. Two keys with the same hash are treated as the same
/// entry by the cache.
#[inline]
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    hasher.finish()
}
