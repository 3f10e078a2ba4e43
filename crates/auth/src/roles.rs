use core::str::FromStr;

use serde::{Deserialize, Serialize};

use assist_core::DomainError;

/// Raw indicator that marks a super administrator.
pub const SUPER_ADMIN_INDICATOR: &str = "1";

/// Raw indicator that marks an administrator.
pub const ADMIN_INDICATOR: &str = "2";

/// Coarse, UI-facing role derived from the raw role indicators.
///
/// Priority: `"1"` beats `"2"`; any collection containing neither is a plain
/// `User`. There is no guest role: an authenticated user always resolves to
/// one of these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "User")]
    User,
}

impl Role {
    /// Derive the role from a raw indicator collection.
    pub fn from_indicators<I, S>(indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut admin = false;
        for indicator in indicators {
            match indicator.as_ref() {
                SUPER_ADMIN_INDICATOR => return Role::SuperAdmin,
                ADMIN_INDICATOR => admin = true,
                _ => {}
            }
        }
        if admin { Role::Admin } else { Role::User }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Super Admin" => Ok(Role::SuperAdmin),
            "Admin" => Ok(Role::Admin),
            "User" => Ok(Role::User),
            other => Err(DomainError::unknown("role", other)),
        }
    }
}
