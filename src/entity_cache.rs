//! # Entity Cache
//!
//! A bounded Least Recently Used (LRU) cache mapping a parent airport id to
//! the owned collection of one child-entity kind (runways, parking spots,
//! helipads, taxi paths, aprons). One instance exists per kind, each with
//! its own capacity.
//!
//! The cache does no I/O: `populate` via [`EntityCache::insert`] is the only
//! way an entry becomes visible and [`EntityCache::get`] never triggers a
//! fetch. Fetch orchestration lives in [`crate::MapQuery`].

use std::collections::HashMap;
use std::hash::Hash;

/// A bounded LRU cache with O(n) eviction.
///
/// For the capacities used here (at most a few hundred airports worth of
/// child entities), the linear scan for eviction is acceptable and simpler
/// than maintaining a linked list.
#[derive(Debug)]
pub struct EntityCache<K, V> {
    capacity: usize,
    entries: HashMap<K, CacheEntry<V>>,
    access_counter: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_access: u64,
}

impl<K: Eq + Hash + Clone, V> EntityCache<K, V> {
    /// Create a new cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            access_counter: 0,
        }
    }

    /// Get a value from the cache, updating its recency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(entry) = self.entries.get_mut(key) {
            self.access_counter += 1;
            entry.last_access = self.access_counter;
            Some(&entry.value)
        } else {
            None
        }
    }

    /// Insert a value, taking ownership. Evicts the least recently used
    /// entry if the cache is at capacity and returns the evicted key.
    ///
    /// Eviction is silent data loss by design, not an error: a dropped
    /// entry is simply re-fetched on its next miss.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        // If the key exists, just replace the collection
        if let Some(entry) = self.entries.get_mut(&key) {
            self.access_counter += 1;
            entry.value = value;
            entry.last_access = self.access_counter;
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            evicted = self.evict_oldest();
        }

        self.access_counter += 1;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: self.access_counter,
            },
        );
        evicted
    }

    /// Check if the cache contains a key without updating recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over all cached entries without touching recency.
    ///
    /// Hit-testing scans every populated entry; counting those scans as
    /// accesses would defeat the recency ordering.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, entry)| (k, &entry.value))
    }

    /// Remove a specific key from the cache.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_counter = 0;
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict the least recently used entry, returning its key.
    fn evict_oldest(&mut self) -> Option<K> {
        // Find the entry with the smallest last_access
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(k, _)| k.clone());

        if let Some(key) = &oldest_key {
            self.entries.remove(key);
        }
        oldest_key
    }
}
