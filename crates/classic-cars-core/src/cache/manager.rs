use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::Car;
use crate::storage::{KeyValueStore, CACHE_KEY, CACHE_TIMESTAMP_KEY};

/// Snapshot lifetime. Long enough to skip refetching on quick restarts,
/// short enough that other clients' edits show up soon.
pub const CACHE_TTL_SECS: i64 = 5 * 60;

const CACHE_TTL_MS: i64 = CACHE_TTL_SECS * 1000;

/// Diagnostic view of the cache, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub exists: bool,
    pub is_valid: bool,
    pub age_seconds: Option<i64>,
    pub max_age_seconds: i64,
}

impl CacheStats {
    pub fn age_display(&self) -> String {
        let Some(seconds) = self.age_seconds else {
            return "never".to_string();
        };

        let minutes = seconds / 60;
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Raw timestamp entry, `Err` when present but unparseable.
    fn stored_timestamp(&self) -> Option<Result<i64, ()>> {
        match self.store.get(CACHE_TIMESTAMP_KEY) {
            Ok(Some(raw)) => Some(raw.trim().parse::<i64>().map_err(|_| ())),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read cache timestamp");
                None
            }
        }
    }

    fn age_ms(&self) -> Option<i64> {
        match self.stored_timestamp()? {
            Ok(written_at) => Some(self.now_ms() - written_at),
            Err(()) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.age_ms().map(|age| age < CACHE_TTL_MS).unwrap_or(false)
    }

    /// Cached list if the snapshot is younger than the TTL.
    /// An expired entry is left in place; only `invalidate` deletes.
    pub fn read(&self) -> Option<Vec<Car>> {
        if !self.is_valid() {
            return None;
        }

        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read cache");
                return None;
            }
        };

        match serde_json::from_str::<Vec<Car>>(&raw) {
            Ok(cars) => {
                debug!(count = cars.len(), "Cache hit");
                Some(cars)
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse cached car list");
                None
            }
        }
    }

    /// Replace the snapshot. Storage failures are logged and swallowed.
    pub fn write(&self, cars: &[Car]) {
        let contents = match serde_json::to_string(cars) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize car list for cache");
                return;
            }
        };

        let result = self
            .store
            .set(CACHE_KEY, &contents)
            .and_then(|_| self.store.set(CACHE_TIMESTAMP_KEY, &self.now_ms().to_string()));

        match result {
            Ok(()) => debug!(count = cars.len(), "Cache written"),
            Err(e) => warn!(error = %e, "Failed to write cache"),
        }
    }

    pub fn invalidate(&self) {
        for key in [CACHE_KEY, CACHE_TIMESTAMP_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to clear cache entry");
            }
        }
        debug!("Cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        let (exists, age_ms) = match self.stored_timestamp() {
            Some(Ok(written_at)) => (true, Some(self.now_ms() - written_at)),
            Some(Err(())) => (true, None),
            None => (false, None),
        };

        CacheStats {
            exists,
            is_valid: age_ms.map(|age| age < CACHE_TTL_MS).unwrap_or(false),
            age_seconds: age_ms.map(|age| age.div_euclid(1000)),
            max_age_seconds: CACHE_TTL_SECS,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
