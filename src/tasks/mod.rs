//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Janitor: Removes expired cache entries at a fixed interval

mod janitor;

pub use janitor::{Janitor, JanitorState};
