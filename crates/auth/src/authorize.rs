use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::grants;
use crate::{Access, Capability};

/// Which capability set a check runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityScope {
    Web,
    Lms,
}

impl core::fmt::Display for CapabilityScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CapabilityScope::Web => f.write_str("web"),
            CapabilityScope::Lms => f.write_str("lms"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing {scope} capability '{capability}'")]
    Forbidden {
        scope: CapabilityScope,
        capability: String,
    },
}

/// Check that `access` grants `required` within `scope`.
///
/// - No IO
/// - No panics
/// - Wildcard `"*"` grants every capability of the scope
pub fn authorize(
    access: &Access,
    scope: CapabilityScope,
    required: &Capability,
) -> Result<(), AuthzError> {
    let granted = match scope {
        CapabilityScope::Web => &access.web,
        CapabilityScope::Lms => &access.lms,
    };

    if grants(granted, required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            scope,
            capability: required.as_str().to_string(),
        })
    }
}
