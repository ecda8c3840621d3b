//! Authorization decision types

use permit_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Layer of the decision procedure that settled a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// User holds the super-admin role
    SuperAdmin,
    /// Direct deny row for the ability
    ExplicitDeny,
    /// A gate returned a decisive result
    Gate,
    /// Direct grant row for the ability
    ExplicitGrant,
    /// One of the user's roles carries the ability
    Role,
    /// Nothing matched
    Default,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::SuperAdmin => "super_admin",
            DecisionSource::ExplicitDeny => "explicit_deny",
            DecisionSource::Gate => "gate",
            DecisionSource::ExplicitGrant => "explicit_grant",
            DecisionSource::Role => "role",
            DecisionSource::Default => "default",
        }
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,

    /// Whether the action is allowed
    pub allowed: bool,

    /// Ability that was checked
    pub ability: String,

    /// User the check was made for
    pub user_id: UserId,

    /// Layer that settled the check
    pub source: DecisionSource,

    /// Decision timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl Decision {
    /// Create a new decision
    pub fn new(
        user_id: UserId,
        ability: impl Into<String>,
        allowed: bool,
        source: DecisionSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed,
            ability: ability.into(),
            user_id,
            source,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Allow decision
    pub fn allow(user_id: UserId, ability: impl Into<String>, source: DecisionSource) -> Self {
        Self::new(user_id, ability, true, source)
    }

    /// Deny decision
    pub fn deny(user_id: UserId, ability: impl Into<String>, source: DecisionSource) -> Self {
        Self::new(user_id, ability, false, source)
    }
}
