//! Time-windowed key/value cache for provider responses.
//!
//! Values are stored as JSON so one cache instance can hold both snapshots
//! and search results; callers get typed values back via serde. Expiry is
//! checked on lookup and stale entries are evicted there, so the map never
//! pays for a dead entry more than once.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::Coordinate;

/// Default time-to-live for cached entries: 10 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: serde_json::Value,
    expires_at: Instant,
}

/// In-memory TTL cache. One shared instance per process, guarded by a
/// mutex because entry overwrite is not atomic across threads.
#[derive(Debug)]
pub struct CacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), default_ttl }
    }

    /// Look up `key`, returning the value only while it is unexpired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Instant::now())
    }

    fn get_at<T: DeserializeOwned>(&self, key: &str, now: Instant) -> Option<T> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;

        if now >= entry.expires_at {
            entries.remove(key);
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                // A type mismatch means the key was reused for a different
                // shape; treat as absent rather than surfacing an error.
                tracing::warn!(key, %err, "cached value failed to deserialize, evicting");
                entries.remove(key);
                None
            }
        }
    }

    /// Store `value` under `key` with the default TTL, overwriting
    /// unconditionally.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    fn set_at<T: Serialize>(&self, key: &str, value: &T, ttl: Duration, now: Instant) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(key, %err, "value not serializable, skipping cache write");
                return;
            }
        };

        let entry = CacheEntry { data, expires_at: now + ttl };
        self.entries.lock().insert(key.to_string(), entry);
    }

    /// Drop `key` so the next lookup misses. Used by refresh operations.
    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Cache key for a coordinate lookup. Coordinates are formatted verbatim,
/// so callers must pass consistent precision to hit the same entry.
pub fn weather_key(coord: Coordinate) -> String {
    format!("weather_{}_{}", coord.lat, coord.lon)
}

/// Cache key for a place search, normalized to lowercase.
pub fn search_key(query: &str) -> String {
    format!("search_{}", query.trim().to_lowercase())
}
