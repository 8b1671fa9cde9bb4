// Response cache module.
// Keeps recent GitHub results in memory and snapshots them to disk between runs.

pub mod paths;
pub mod store;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

pub use store::{load_snapshot, save_snapshot};

/// TTL for repository metadata: 10 minutes.
pub const METADATA_TTL: Duration = Duration::from_secs(10 * 60);

/// TTL for issue lists: 5 minutes.
pub const ISSUES_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached fetch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// `None` records that the resource was not found.
    pub payload: Option<T>,
    /// Epoch milliseconds.
    pub fetched_at: i64,
    /// Rate-limit window active when this entry was fetched.
    pub rate_limit_reset_at: Option<i64>,
}

impl<T> CacheEntry<T> {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.fetched_at
    }

    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        self.age_ms(now_ms) < ttl.as_millis() as i64
    }

    /// Whether the window recorded with this entry is still running.
    pub fn within_rate_limit_window(&self, now_ms: i64) -> bool {
        self.rate_limit_reset_at.is_some_and(|reset| reset > now_ms)
    }
}

/// Keyed cache of fetch results.
///
/// There is no eviction: entries are replaced in place by key and judged
/// stale by the caller against its own TTL.
pub struct ResponseCache<T> {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries().get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, payload: Option<T>, rate_limit_reset_at: Option<i64>) {
        let entry = CacheEntry {
            payload,
            fetched_at: self.clock.now_ms(),
            rate_limit_reset_at,
        };
        self.entries().insert(key.into(), entry);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, CacheEntry<T>> {
        self.entries().clone()
    }

    /// Merge previously saved entries, keeping any newer in-memory entry.
    pub fn restore(&self, saved: HashMap<String, CacheEntry<T>>) {
        let mut entries = self.entries();
        for (key, entry) in saved {
            match entries.get(&key) {
                Some(existing) if existing.fetched_at >= entry.fetched_at => {}
                _ => {
                    entries.insert(key, entry);
                }
            }
        }
    }
}
