//! Identity record returned by the credential service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authenticated user as returned by `authenticate` and persisted across
/// reloads.
///
/// Provider-specific fields that this client does not interpret are kept in
/// `extra` so the persisted record round-trips verbatim.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque bearer token sent on every authenticated call.
    pub token: String,

    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub user_name: String,

    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub email: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(token: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_name: user_name.into(),
            email: String::new(),
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Display name, falling back to the email when the provider sent none.
    pub fn display_name(&self) -> &str {
        if self.user_name.trim().is_empty() {
            &self.email
        } else {
            &self.user_name
        }
    }
}

// Tokens never end up in logs.
impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("token", &"<redacted>")
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}
