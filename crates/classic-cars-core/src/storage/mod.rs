//! Key-value string storage backing the list cache and the demo-mode store.
//!
//! Values are JSON (or, for timestamps, decimal) strings keyed by a fixed
//! set of names:
//! - `classic-cars-cache`: cached car list snapshot
//! - `classic-cars-cache-timestamp`: snapshot write time in epoch millis
//! - `classic-cars-local`: demo-mode record set

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Key of the cached car list.
pub const CACHE_KEY: &str = "classic-cars-cache";

/// Key of the cache write timestamp.
pub const CACHE_TIMESTAMP_KEY: &str = "classic-cars-cache-timestamp";

/// Key of the demo-mode record set.
pub const LOCAL_CARS_KEY: &str = "classic-cars-local";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
