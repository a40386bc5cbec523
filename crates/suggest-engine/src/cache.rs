//! Response cache with bounded entry lifetime.
//!
//! A cache miss is never an error. Expired entries are evicted lazily on read;
//! there is no background sweep.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use suggest_core::Suggestion;
use tokio::time::Instant;

use crate::transport::TransportRequest;

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(suggest_core::DEFAULT_CACHE_TTL_MS);

/// Key -> suggestions store.
///
/// A single instance may be shared by several widgets through an `Arc`, so
/// implementations must be safe under interleaved access.
pub trait SuggestionCache<T>: Send + Sync {
    /// Look up a live entry.
    fn get(&self, key: &str) -> Option<Vec<Suggestion<T>>>;

    /// Store `value` for `ttl`.
    fn set(&self, key: String, value: Vec<Suggestion<T>>, ttl: Duration);

    /// Drop every entry.
    fn clear(&self);
}

/// A cached response and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: Vec<Suggestion<T>>,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache with wall-clock expiry.
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> MemoryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> SuggestionCache<T> for MemoryCache<T> {
    fn get(&self, key: &str) -> Option<Vec<Suggestion<T>>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set(&self, key: String, value: Vec<Suggestion<T>>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .lock()
            .insert(key, CacheEntry { value, expires_at });
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Build a cache key covering everything that affects the response.
///
/// Payload objects serialize with sorted keys, and headers are sorted here,
/// so logically equal requests always map to the same key.
pub fn cache_key(request: &TransportRequest) -> String {
    let mut headers: Vec<_> = request
        .headers
        .iter()
        .map(|(n, v)| format!("{}={}", n.to_ascii_lowercase(), v))
        .collect();
    headers.sort();

    format!(
        "{}|{}|{}",
        request.endpoint,
        request.payload,
        headers.join("&")
    )
}
