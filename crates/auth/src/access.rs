use serde::{Deserialize, Deserializer, Serialize};

use crate::{Capability, Role};

/// Authorization payload resolved for the current user.
///
/// Never persisted: it is fetched once per user lifetime and reset to
/// [`Access::default`] whenever the user goes away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Capabilities in the portal itself.
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub web: Vec<Capability>,

    /// Capabilities in the learning-management system.
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub lms: Vec<Capability>,

    /// Raw role indicators (e.g. `"1"`, `"2"`), see [`Role::from_indicators`].
    #[serde(default, deserialize_with = "indicators")]
    pub role: Vec<String>,
}

impl Access {
    pub fn new(web: Vec<Capability>, lms: Vec<Capability>, role: Vec<String>) -> Self {
        Self { web, lms, role }
    }

    pub fn is_empty(&self) -> bool {
        self.web.is_empty() && self.lms.is_empty() && self.role.is_empty()
    }

    /// Coarse role derived from the raw indicators.
    pub fn derived_role(&self) -> Role {
        Role::from_indicators(&self.role)
    }

    pub fn can_web(&self, capability: &str) -> bool {
        grants(&self.web, capability)
    }

    pub fn can_lms(&self, capability: &str) -> bool {
        grants(&self.lms, capability)
    }
}

pub(crate) fn grants(granted: &[Capability], capability: &str) -> bool {
    granted
        .iter()
        .any(|c| c.is_wildcard() || c.as_str() == capability)
}

/// Accept indicators as strings or bare numbers (`["1"]` and `[1]` alike).
fn indicators<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Indicator {
        Text(String),
        Number(i64),
    }

    let raw: Option<Vec<Indicator>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|i| match i {
            Indicator::Text(s) => s,
            Indicator::Number(n) => n.to_string(),
        })
        .collect())
}
