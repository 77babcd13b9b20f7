//! TTL-based caching for transfer guide lookups.
//!
//! The search nonce and the institution/subject id tables change rarely, but
//! a full institution refresh would otherwise re-fetch them for every subject.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// A cached value with metadata.
#[derive(Clone)]
struct CachedValue<V> {
    value: V,
    cached_at: Instant,
    ttl: Duration,
}

/// Thread-safe TTL cache keyed by string.
pub struct LookupCache<V> {
    entries: DashMap<String, CachedValue<V>>,
    default_ttl: Duration,
}

impl<V: Clone> LookupCache<V> {
    /// Creates a new cache with the specified default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Gets a cached value if it exists and hasn't expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).and_then(|entry| {
            if entry.cached_at.elapsed() < entry.ttl {
                Some(entry.value.clone())
            } else {
                drop(entry);
                self.entries.remove(key);
                None
            }
        })
    }

    /// Inserts a value with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Inserts a value with a custom TTL.
    fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CachedValue {
                value,
                cached_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Invalidates (removes) a cached entry.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_fresh_entries() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.insert("LANG", 15_i64);

        assert_eq!(cache.get("LANG"), Some(15));
        assert_eq!(cache.get("UBCV"), None);
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("nonce", "abc".to_string(), Duration::ZERO);

        assert_eq!(cache.get("nonce"), None);
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.insert("nonce", "abc".to_string());
        cache.invalidate("nonce");
        assert_eq!(cache.get("nonce"), None);
    }
}
