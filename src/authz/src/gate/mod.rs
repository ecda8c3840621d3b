//! Dynamic authorization rules ("gates")
//!
//! A gate decides an ability from user and resource attributes, independent
//! of static role data. The [`GateRegistry`] composes three ordered
//! collections into one tri-state answer:
//!
//! ```text
//! before hooks ──decisive──▶ result
//!      │ undecided
//!      ▼
//! ability rule ──none──▶ Undecided
//!      │ provisional
//!      ▼
//! after hooks (last decisive wins) ──▶ result
//! ```
//!
//! Every registered callback conforms to one fixed shape ([`GateRule`],
//! [`BeforeHook`], [`AfterHook`]); closures implement them through
//! blanket impls.

pub mod registry;
pub mod resource;

pub use registry::GateRegistry;
pub use resource::{ResourceAbility, ResourcePolicy};

use permit_core::{Resource, User};
use serde::{Deserialize, Serialize};

/// Tri-state gate result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateOutcome {
    Allow,
    Deny,
    /// Defer to the next authorization layer
    Undecided,
}

impl GateOutcome {
    /// Allow or Deny
    pub fn is_decisive(&self) -> bool {
        !matches!(self, GateOutcome::Undecided)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GateOutcome::Allow => Some(true),
            GateOutcome::Deny => Some(false),
            GateOutcome::Undecided => None,
        }
    }
}

impl From<bool> for GateOutcome {
    fn from(allowed: bool) -> Self {
        if allowed {
            GateOutcome::Allow
        } else {
            GateOutcome::Deny
        }
    }
}

impl From<Option<bool>> for GateOutcome {
    fn from(result: Option<bool>) -> Self {
        result.map_or(GateOutcome::Undecided, GateOutcome::from)
    }
}

/// Rule registered for one ability
pub trait GateRule: Send + Sync {
    fn evaluate(&self, user: &User, resource: Option<&Resource>) -> GateOutcome;
}

impl<F> GateRule for F
where
    F: Fn(&User, Option<&Resource>) -> GateOutcome + Send + Sync,
{
    fn evaluate(&self, user: &User, resource: Option<&Resource>) -> GateOutcome {
        self(user, resource)
    }
}

/// Hook run before any ability rule
pub trait BeforeHook: Send + Sync {
    fn before(&self, user: &User, ability: &str, resource: Option<&Resource>) -> GateOutcome;
}

impl<F> BeforeHook for F
where
    F: Fn(&User, &str, Option<&Resource>) -> GateOutcome + Send + Sync,
{
    fn before(&self, user: &User, ability: &str, resource: Option<&Resource>) -> GateOutcome {
        self(user, ability, resource)
    }
}

/// Hook run after the ability rule, receiving its provisional result
pub trait AfterHook: Send + Sync {
    fn after(
        &self,
        user: &User,
        ability: &str,
        provisional: GateOutcome,
        resource: Option<&Resource>,
    ) -> GateOutcome;
}

impl<F> AfterHook for F
where
    F: Fn(&User, &str, GateOutcome, Option<&Resource>) -> GateOutcome + Send + Sync,
{
    fn after(
        &self,
        user: &User,
        ability: &str,
        provisional: GateOutcome,
        resource: Option<&Resource>,
    ) -> GateOutcome {
        self(user, ability, provisional, resource)
    }
}
