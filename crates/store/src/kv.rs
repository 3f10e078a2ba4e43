//! Key-value store abstraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{CookieOptions, SameSite};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is corrupt: {0}")]
    Corrupt(String),

    #[error("no application data directory available")]
    NoDataDir,
}

/// Scoped string storage with cookie semantics.
///
/// Implementations must treat expired entries as absent.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S> KeyValueStore for std::sync::Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        (**self).set(key, value, options)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// A value plus the attributes it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl StoredEntry {
    pub fn new(value: &str, options: &CookieOptions, now: DateTime<Utc>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: options.expires_at(now),
            path: options.path.clone(),
            same_site: options.same_site,
            secure: options.secure,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
