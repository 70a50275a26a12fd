//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// `AlreadyExists` and `NotFound` are ordinary, recoverable outcomes of
/// [`add`](crate::cache::CacheStore::add) and
/// [`replace`](crate::cache::CacheStore::replace); the stored value is left
/// untouched when either is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A live entry is already stored under the key
    #[error("Item {0} already exists")]
    AlreadyExists(String),

    /// No live entry is stored under the key
    #[error("Item {0} doesn't exist")]
    NotFound(String),

    /// A janitor was requested outside of a Tokio runtime
    #[error("A cleanup interval requires a running Tokio runtime")]
    NoRuntime,

    /// A stopped janitor cannot be started again
    #[error("Janitor has already been stopped")]
    JanitorStopped,

    /// Construction parameters were rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_key() {
        assert_eq!(
            CacheError::AlreadyExists("k".to_string()).to_string(),
            "Item k already exists"
        );
        assert_eq!(
            CacheError::NotFound("missing".to_string()).to_string(),
            "Item missing doesn't exist"
        );
    }
}
