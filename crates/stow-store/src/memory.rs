use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::codec::Serializable;
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding. Keys are stored verbatim. The map sits
/// behind a `RwLock` so each call is memory-safe, but no atomicity spans
/// calls: concurrent writers of one key need a locking decorator.
///
/// Deleting an absent key fails with [`StoreError::KeyNotFound`].
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        let map = self.entries.read().expect("lock poisoned");
        let data = map.get(key).ok_or_else(|| StoreError::not_found(key))?;
        dst.deserialize(data)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        // Encode before taking the lock: a failed encode never touches the map.
        let data = val.serialize()?;
        debug!(key, len = data.len(), "memory set");
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), data);
        Ok(())
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        match map.remove(key) {
            Some(_) => {
                debug!(key, "memory del");
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("key_count", &self.len())
            .finish()
    }
}
