use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// `SameSite` attribute of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

/// Write options for a stored value (cookie attributes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Lifetime in days; `None` keeps the value until removed.
    pub expires_days: Option<i64>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            expires_days: Some(1),
            path: "/".to_string(),
            same_site: SameSite::Strict,
            secure: true,
        }
    }
}

impl CookieOptions {
    pub fn session() -> Self {
        Self {
            expires_days: None,
            ..Self::default()
        }
    }

    /// Absolute expiry for a value written at `now`. A lifetime too large to
    /// represent means the value never expires.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_days
            .and_then(TimeDelta::try_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
    }
}
