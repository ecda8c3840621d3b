//! Resource policies: one gate per standard ability of a resource type

use super::{GateOutcome, GateRule};
use permit_core::{Resource, User};
use std::fmt;
use std::sync::Arc;

/// Policy deciding the standard abilities of one resource type.
///
/// Every method denies unless overridden.
pub trait ResourcePolicy: Send + Sync {
    fn view_any(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn view(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn create(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn update(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn delete(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn restore(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }

    fn force_delete(&self, _user: &User, _resource: Option<&Resource>) -> bool {
        false
    }
}

/// Standard resource abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAbility {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
    Restore,
    ForceDelete,
}

impl ResourceAbility {
    pub const ALL: [ResourceAbility; 7] = [
        ResourceAbility::ViewAny,
        ResourceAbility::View,
        ResourceAbility::Create,
        ResourceAbility::Update,
        ResourceAbility::Delete,
        ResourceAbility::Restore,
        ResourceAbility::ForceDelete,
    ];

    /// Ability suffix (`viewAny`, `forceDelete`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAbility::ViewAny => "viewAny",
            ResourceAbility::View => "view",
            ResourceAbility::Create => "create",
            ResourceAbility::Update => "update",
            ResourceAbility::Delete => "delete",
            ResourceAbility::Restore => "restore",
            ResourceAbility::ForceDelete => "forceDelete",
        }
    }

    /// Call the policy method for this ability
    pub fn invoke(
        &self,
        policy: &dyn ResourcePolicy,
        user: &User,
        resource: Option<&Resource>,
    ) -> bool {
        match self {
            ResourceAbility::ViewAny => policy.view_any(user, resource),
            ResourceAbility::View => policy.view(user, resource),
            ResourceAbility::Create => policy.create(user, resource),
            ResourceAbility::Update => policy.update(user, resource),
            ResourceAbility::Delete => policy.delete(user, resource),
            ResourceAbility::Restore => policy.restore(user, resource),
            ResourceAbility::ForceDelete => policy.force_delete(user, resource),
        }
    }
}

impl fmt::Display for ResourceAbility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate rule delegating one ability to a shared policy
pub(crate) struct PolicyRule {
    policy: Arc<dyn ResourcePolicy>,
    ability: ResourceAbility,
}

impl PolicyRule {
    pub(crate) fn new(policy: Arc<dyn ResourcePolicy>, ability: ResourceAbility) -> Self {
        Self { policy, ability }
    }
}

impl GateRule for PolicyRule {
    fn evaluate(&self, user: &User, resource: Option<&Resource>) -> GateOutcome {
        self.ability
            .invoke(self.policy.as_ref(), user, resource)
            .into()
    }
}
