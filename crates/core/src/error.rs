//! Errors for values that do not fit the shared model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A value from outside (wire, storage, command line) was rejected while
/// parsing it into a model type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Well-formed, but not one of the known values.
    #[error("unknown {kind} '{value}'")]
    Unknown { kind: &'static str, value: String },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },
}

impl DomainError {
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Unknown {
            kind,
            value: value.into(),
        }
    }

    pub fn invalid(kind: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            kind,
            reason: reason.to_string(),
        }
    }
}
