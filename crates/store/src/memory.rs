//! In-memory store for tests/dev and headless embedding.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::kv::{KeyValueStore, StoreError, StoredEntry};
use crate::options::CookieOptions;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry including attributes (expired entries included).
    pub fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        let entry = StoredEntry::new(value, options, Utc::now());
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .remove(key);
        Ok(())
    }
}
