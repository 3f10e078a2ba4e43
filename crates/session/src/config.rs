//! Session engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use assist_store::CookieOptions;

/// Key under which the current user is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "assistuser";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// What to do when a (non-401) privilege fetch fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeRetryPolicy {
    /// Total attempts per resolution, including the first. `1` disables retries.
    pub max_attempts: u32,

    /// Pause between attempts.
    #[serde(with = "millis")]
    pub backoff: Duration,
}

impl Default for PrivilegeRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the portal backend.
    pub api_url: String,
    pub login_path: String,
    pub privileges_path: String,

    pub storage_key: String,
    pub cookie: CookieOptions,
    /// Store file; `None` means the OS data directory.
    pub store_path: Option<PathBuf>,

    /// Where the user lands after logout.
    pub entry_path: String,

    /// Time between the "session expired" notification and the forced logout.
    #[serde(with = "millis")]
    pub expiry_logout_delay: Duration,

    #[serde(with = "millis")]
    pub request_timeout: Duration,

    pub privilege_retry: PrivilegeRetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            login_path: "/login".to_string(),
            privileges_path: "/privileges".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            cookie: CookieOptions::default(),
            store_path: None,
            entry_path: "/".to_string(),
            expiry_logout_delay: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(30),
            privilege_retry: PrivilegeRetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `ASSIST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`SessionConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match lookup("ASSIST_API_URL") {
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty { var: "ASSIST_API_URL" });
            }
            Some(url) => config.api_url = url.trim().trim_end_matches('/').to_string(),
            None => tracing::warn!(
                api_url = %config.api_url,
                "ASSIST_API_URL not set; using local default"
            ),
        }

        if let Some(path) = lookup("ASSIST_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            config.store_path = Some(PathBuf::from(path));
        }

        if let Some(ms) = number(&lookup, "ASSIST_EXPIRY_LOGOUT_DELAY_MS")? {
            config.expiry_logout_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = number(&lookup, "ASSIST_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = number(&lookup, "ASSIST_PRIVILEGE_RETRIES")? {
            // Retries on top of the first attempt.
            config.privilege_retry.max_attempts = u32::try_from(retries)
                .unwrap_or(u32::MAX - 1)
                .saturating_add(1);
        }

        Ok(config)
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
