//! Keyed storage for reusable objects.
//!
//! Entries are shared (`Arc`) so the same object may also be referenced from
//! elsewhere, e.g. the layer stack. Removing or replacing an entry runs the
//! object's [`Disposable`] hook.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Release hook invoked when a cache gives up an entry.
pub trait Disposable {
    /// Release held resources. Must tolerate repeated calls.
    fn dispose(&self);
}

/// String-keyed map that disposes the objects it drops.
pub struct Cache<V: Disposable> {
    entries: HashMap<String, Arc<V>>,
}

impl<V: Disposable> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Disposable> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<V: Disposable> Cache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    /// Store `value` under `key`, disposing a different previous occupant.
    pub fn set(&mut self, key: impl Into<String>, value: Arc<V>) {
        let key = key.into();
        if let Some(previous) = self.entries.insert(key, Arc::clone(&value)) {
            if !Arc::ptr_eq(&previous, &value) {
                previous.dispose();
            }
        }
    }

    /// Drop the entry for `key`, disposing its occupant.
    pub fn remove(&mut self, key: &str) {
        if let Some(previous) = self.entries.remove(key) {
            previous.dispose();
        }
    }

    /// Drop the entry for `key` without disposing it.
    pub fn take(&mut self, key: &str) -> Option<Arc<V>> {
        self.entries.remove(key)
    }

    /// Dispose every occupant and empty the cache.
    pub fn dispose(&mut self) {
        for (_, value) in self.entries.drain() {
            value.dispose();
        }
    }

    /// Whether this exact object is stored under any key.
    pub fn contains(&self, value: &Arc<V>) -> bool {
        self.entries.values().any(|entry| Arc::ptr_eq(entry, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
