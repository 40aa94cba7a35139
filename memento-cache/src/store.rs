//! In-memory cache stores.
//!
//! Neither store evicts or expires entries. An entry lives until it is
//! removed or the store is cleared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;

use memento_core::traits::CacheStore;

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries currently held
    pub entries: usize,
    /// Calls to `get`
    pub lookups: u64,
    /// Calls to `get` that found a value
    pub hits: u64,
}

impl StoreStats {
    /// Fraction of lookups that found a value, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicU64,
    hits: AtomicU64,
}

impl Counters {
    fn record<V>(&self, found: &Option<V>) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self, entries: usize) -> StoreStats {
        StoreStats {
            entries,
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory store behind a single reader-writer lock.
///
/// Thread-safe. Reads proceed in parallel; writes are exclusive.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, V>>,
    counters: Counters,
}

impl<V> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty store with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            counters: Counters::default(),
        }
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().remove(key)
    }

    /// Removes all entries and resets statistics.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.counters.reset();
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot(self.len())
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for MemoryStore<V> {
    fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        let found = self.entries.read().get(key).cloned();
        self.counters.record(&found);
        found
    }

    fn set(&self, key: String, value: V) {
        self.entries.write().insert(key, value);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONCURRENT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Sharded in-memory store.
///
/// Uses a concurrent map so writers to different keys rarely contend.
#[derive(Debug)]
pub struct ConcurrentStore<V> {
    entries: DashMap<String, V>,
    counters: Counters,
}

impl<V> ConcurrentStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Creates an empty store with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            counters: Counters::default(),
        }
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Removes all entries and resets statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.counters.reset();
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot(self.len())
    }
}

impl<V> Default for ConcurrentStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for ConcurrentStore<V> {
    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        let found = self.entries.get(key).map(|e| e.value().clone());
        self.counters.record(&found);
        found
    }

    fn set(&self, key: String, value: V) {
        self.entries.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_store_set_get() {
        let store = MemoryStore::new();
        store.set("a".to_string(), 1);
        assert!(store.has("a"));
        assert_eq!(store.get("a"), Some(1));
        assert!(!store.has("b"));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn test_memory_store_overwrite() {
        let store = MemoryStore::new();
        store.set("a".to_string(), 1);
        store.set("a".to_string(), 2);
        assert_eq!(store.get("a"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_remove_and_clear() {
        let store = MemoryStore::new();
        store.set("a".to_string(), "x");
        store.set("b".to_string(), "y");
        assert_eq!(store.remove("a"), Some("x"));
        assert!(!store.has("a"));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_keys_sorted() {
        let store = MemoryStore::new();
        store.set("b".to_string(), ());
        store.set("a".to_string(), ());
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_memory_store_stats() {
        let store = MemoryStore::new();
        store.set("a".to_string(), 1);
        store.get("a");
        store.get("a");
        store.get("missing");
        let stats = store.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.lookups, 3);
        assert_eq!(stats.hits, 2);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        store.clear();
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_has_does_not_count_as_lookup() {
        let store: MemoryStore<i32> = MemoryStore::new();
        store.has("a");
        assert_eq!(store.stats().lookups, 0);
    }

    #[test]
    fn test_concurrent_store_set_get() {
        let store = ConcurrentStore::new();
        store.set("a".to_string(), vec![1, 2]);
        assert!(store.has("a"));
        assert_eq!(store.get("a"), Some(vec![1, 2]));
        assert_eq!(store.remove("a"), Some(vec![1, 2]));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_store_parallel_writers() {
        let store = Arc::new(ConcurrentStore::with_capacity(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.set(format!("{t}-{i}"), i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 800);
        assert_eq!(store.get("7-99"), Some(99));
    }

    #[test]
    fn test_stores_are_object_safe() {
        let stores: Vec<Arc<dyn CacheStore<u8>>> = vec![
            Arc::new(MemoryStore::new()),
            Arc::new(ConcurrentStore::new()),
        ];
        for store in stores {
            store.set("k".to_string(), 7);
            assert_eq!(store.get("k"), Some(7));
        }
    }
}
