//! Credential payloads and the credential service response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credential payload forwarded to `authenticate`.
///
/// The shape is owned by the credential service; this is an open JSON object
/// with helpers for the common email/password form.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new()
            .with("email", Value::String(email.into()))
            .with("password", Value::String(password.into()))
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The login identifier, when the payload carries one.
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Credentials {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

// Only field names are printed; values may be secrets.
impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Credentials")
            .field(&self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `status` field of the credential service envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Wire envelope: `{ status, message?, data? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Collapse the envelope into an outcome. `data` stays optional: whether a
    /// missing payload is acceptable is up to the operation.
    pub fn into_outcome(self) -> ServiceOutcome<Option<T>> {
        match self.status {
            ResponseStatus::Success => ServiceOutcome::Success(self.data),
            ResponseStatus::Error => ServiceOutcome::Failure {
                message: self.message,
            },
        }
    }
}

/// Non-exceptional result of a credential service call.
///
/// `Failure` is a server-reported rejection (wrong password, disabled
/// account...). Transport problems are reported separately as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutcome<T> {
    Success(T),
    Failure { message: Option<String> },
}

impl<T> ServiceOutcome<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ServiceOutcome::Success(_))
    }
}
