// src/cache/result_cache.rs
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use lru::LruCache;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::utils::config::EngineConfig;

/// Default time-to-live for cached result sets (one hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;
/// Default number of distinct queries retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Builds deterministic cache keys from a query type and named parameters.
///
/// Parameters are held in a `BTreeMap`, so the key does not depend on the
/// order in which call sites add them.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    query_type: String,
    params: BTreeMap<String, JsonValue>,
}

impl CacheKeyBuilder {
    pub fn new(query_type: &str) -> Self {
        Self {
            query_type: query_type.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Hex SHA-256 of `"<query_type>:<params as sorted JSON>"`.
    pub fn build(&self) -> String {
        // Serializing a BTreeMap of JSON values cannot fail.
        let params_json = serde_json::to_string(&self.params).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(self.query_type.as_bytes());
        hasher.update(b":");
        hasher.update(params_json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Key → (value, timestamp) store with soft TTL expiry.
///
/// Expired entries are ignored on read rather than swept; they are replaced
/// by the next `put` for the same key or pushed out by LRU capacity. A lock
/// poisoned by a panicking caller is recovered, not treated as fatal.
pub struct ResultCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    ttl: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        info!(
            "Initializing ResultCache with capacity: {}, ttl: {}s",
            capacity,
            ttl.num_seconds()
        );
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Duration::seconds(config.cache_ttl_secs), config.cache_capacity)
    }

    fn lock_entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Result cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Looks up `key` as of `now`. Entries older than the TTL are absent.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let found = self
            .lock_entries()
            .get(key)
            .filter(|entry| now - entry.inserted_at < self.ttl)
            .map(|entry| entry.value.clone());

        if found.is_some() {
            let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
            if hits % 100 == 0 {
                let misses = self.misses.load(Ordering::Relaxed);
                info!(
                    "ResultCache stats - hits: {}, misses: {}, hit rate: {:.2}%",
                    hits,
                    misses,
                    (hits as f64 / (hits + misses) as f64) * 100.0
                );
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn put(&self, key: String, value: V) {
        self.put_at(key, value, Utc::now());
    }

    /// Stores `value` under `key`, overwriting any previous entry.
    pub fn put_at(&self, key: String, value: V, now: DateTime<Utc>) {
        debug!("Caching result under key {}", key);
        self.lock_entries().put(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    /// (hits, misses)
    pub fn get_stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        info!("Result cache cleared");
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_CACHE_CAPACITY)
    }
}

/// A thread-safe handle to a result cache, shared by all callers of an engine.
pub type SharedResultCache<V> = Arc<ResultCache<V>>;

pub fn create_shared_cache<V: Clone>(config: &EngineConfig) -> SharedResultCache<V> {
    Arc::new(ResultCache::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_key_is_order_independent() {
        let a = CacheKeyBuilder::new("find_lookalikes")
            .param("state", "TX")
            .param("threshold", 85)
            .param("expanded_specialties", json!(["internal medicine"]))
            .build();
        let b = CacheKeyBuilder::new("find_lookalikes")
            .param("expanded_specialties", json!(["internal medicine"]))
            .param("threshold", 85)
            .param("state", "TX")
            .build();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_depends_on_values_and_query_type() {
        let base = CacheKeyBuilder::new("find_lookalikes").param("state", "TX");
        let other_state = CacheKeyBuilder::new("find_lookalikes").param("state", "CA");
        let other_type = CacheKeyBuilder::new("search_orgs").param("state", "TX");
        assert_ne!(base.build(), other_state.build());
        assert_ne!(base.build(), other_type.build());
        assert_ne!(
            base.clone().param("max_results", JsonValue::Null).build(),
            base.param("max_results", 5).build()
        );
    }

    #[test]
    fn test_get_within_ttl_returns_value() {
        let cache: ResultCache<Vec<u8>> = ResultCache::new(Duration::seconds(60), 10);
        let t0 = Utc::now();
        cache.put_at("k".to_string(), vec![1, 2, 3], t0);
        assert_eq!(cache.get_at("k", t0 + Duration::seconds(59)), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_stats(), (1, 0));
    }

    #[test]
    fn test_get_after_ttl_is_absent_but_not_purged() {
        let cache: ResultCache<u32> = ResultCache::new(Duration::seconds(60), 10);
        let t0 = Utc::now();
        cache.put_at("k".to_string(), 7, t0);
        assert_eq!(cache.get_at("k", t0 + Duration::seconds(60)), None);
        assert_eq!(cache.len(), 1);

        cache.put_at("k".to_string(), 8, t0 + Duration::seconds(61));
        assert_eq!(cache.get_at("k", t0 + Duration::seconds(62)), Some(8));
    }

    #[test]
    fn test_unknown_key_is_miss() {
        let cache: ResultCache<u32> = ResultCache::default();
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.get_stats(), (0, 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache: ResultCache<u32> = ResultCache::new(Duration::seconds(60), 2);
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        cache.put("c".to_string(), 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_resets_entries_and_stats() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.put("a".to_string(), 1);
        let _ = cache.get("a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_stats(), (0, 0));
    }

    #[test]
    fn test_poisoned_lock_keeps_serving() {
        let cache: Arc<ResultCache<u32>> = Arc::new(ResultCache::new(Duration::seconds(60), 10));
        cache.put("a".to_string(), 1);

        let poisoner = Arc::clone(&cache);
        let joined = thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("caller panicked while holding the cache lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.get("a"), Some(1));
        cache.put("b".to_string(), 2);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
