//! Key-value abstraction for ephemeral state
//!
//! Thread-safe default implementation using DashMap

use std::sync::Arc;

use dashmap::DashMap;

/// Minimal key-value contract used by the session and verification stores
pub trait KeyValueStore<V>: Send + Sync {
    /// Get a copy of the value for `key`
    fn get(&self, key: &str) -> Option<V>;

    /// Insert or overwrite the value for `key`
    fn set(&self, key: &str, value: V);

    /// Remove the value for `key`, returning it
    fn delete(&self, key: &str) -> Option<V>;

    /// Read-modify-write the value for `key`, creating it with
    /// `V::default()` when absent.
    ///
    /// The default implementation is a plain get-then-set with no atomicity;
    /// implementations that can lock per key should override it.
    fn update(&self, key: &str, f: &mut dyn FnMut(&mut V))
    where
        V: Default,
    {
        let mut value = self.get(key).unwrap_or_default();
        f(&mut value);
        self.set(key, value);
    }
}

/// In-memory store backed by a sharded concurrent map
pub struct DashMapStore<V> {
    entries: Arc<DashMap<String, V>>,
}

impl<V> DashMapStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<V> Default for DashMapStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for DashMapStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V: Clone + Send + Sync> KeyValueStore<V> for DashMapStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut V))
    where
        V: Default,
    {
        // The entry guard holds the shard lock for the duration of `f`.
        let mut entry = self.entries.entry(key.to_string()).or_default();
        f(entry.value_mut());
    }
}
