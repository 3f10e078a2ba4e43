//! JSON-file backed store (the desktop equivalent of a cookie jar).
//!
//! The whole jar lives in one JSON object keyed by entry name. Every read goes
//! to disk, so values written by another process are picked up on the next
//! `get`. Writes replace the file atomically (temp file + rename).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use crate::kv::{KeyValueStore, StoreError, StoredEntry};
use crate::options::CookieOptions;

type Jar = BTreeMap<String, StoredEntry>;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the default location: `{app_data_dir}/assist/session.json`.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(default_store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_jar(&self) -> Result<Jar, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Jar::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Jar::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn write_jar(&self, jar: &Jar) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload =
            serde_json::to_string_pretty(jar).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Jar)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut jar = match self.read_jar() {
            Ok(jar) => jar,
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(path = ?self.path, %reason, "discarding corrupt store file");
                Jar::new()
            }
            Err(err) => return Err(err),
        };
        let now = Utc::now();
        jar.retain(|_, entry| !entry.is_expired(now));
        f(&mut jar);
        self.write_jar(&jar)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let jar = self.read_jar()?;
        Ok(jar
            .get(key)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        let entry = StoredEntry::new(value, options, Utc::now());
        self.modify(|jar| {
            jar.insert(key.to_string(), entry);
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.modify(|jar| {
            jar.remove(key);
        })
    }
}

/// Resolve the default store path: `{app_data_dir}/assist/session.json`.
pub fn default_store_path() -> Result<PathBuf, StoreError> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(StoreError::NoDataDir)?;

    let mut path = base;
    path.push("assist");
    path.push("session.json");
    Ok(path)
}
