//! Short-lived snapshot of the full car list.
//!
//! This module provides the `CacheManager`, which keeps the last successful
//! list fetch in the key-value store together with its write time. A
//! snapshot is served for 5 minutes and is dropped explicitly after any
//! create, update or delete so stale data is never shown after a write.

pub mod manager;

pub use manager::{CacheManager, CacheStats, CACHE_TTL_SECS};
