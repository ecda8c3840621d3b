//! Gate registry with before/after hook composition

use super::resource::{PolicyRule, ResourceAbility, ResourcePolicy};
use super::{AfterHook, BeforeHook, GateOutcome, GateRule};
use parking_lot::RwLock;
use permit_core::{Resource, User};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Registry of gate rules and hooks.
///
/// Registration and checks take `&self`, so the registry can be shared
/// behind an `Arc`. Callbacks are invoked after the internal locks are
/// released; a callback may query the registry without deadlocking.
///
/// # Example
///
/// ```rust
/// use permit_authz::gate::{GateOutcome, GateRegistry};
/// use permit_core::{Resource, User};
///
/// let gates = GateRegistry::new();
/// gates.define("posts.update", |user: &User, post: Option<&Resource>| {
///     post.map_or(false, |p| p.is_owned_by(user))
/// });
///
/// let alice = User::new("alice");
/// let post = Resource::new("post:1").with_attribute("owner_id", "alice");
/// assert_eq!(gates.check("posts.update", &alice, Some(&post)), GateOutcome::Allow);
/// assert_eq!(gates.check("posts.delete", &alice, Some(&post)), GateOutcome::Undecided);
/// ```
#[derive(Default)]
pub struct GateRegistry {
    rules: RwLock<HashMap<String, Arc<dyn GateRule>>>,
    before: RwLock<Vec<Arc<dyn BeforeHook>>>,
    after: RwLock<Vec<Arc<dyn AfterHook>>>,
}

impl GateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the rule for an ability, replacing any existing one.
    ///
    /// The closure may return `bool`, `Option<bool>` or [`GateOutcome`].
    pub fn define<F, O>(&self, ability: impl Into<String>, rule: F) -> &Self
    where
        F: Fn(&User, Option<&Resource>) -> O + Send + Sync + 'static,
        O: Into<GateOutcome>,
    {
        self.define_rule(
            ability,
            move |user: &User, resource: Option<&Resource>| -> GateOutcome {
                rule(user, resource).into()
            },
        )
    }

    /// Define the rule for an ability from a [`GateRule`] value
    pub fn define_rule<R>(&self, ability: impl Into<String>, rule: R) -> &Self
    where
        R: GateRule + 'static,
    {
        let ability = ability.into();
        debug!(ability = %ability, "Gate defined");
        self.rules.write().insert(ability, Arc::new(rule));
        self
    }

    /// Register a hook that runs before every ability rule
    pub fn before<F, O>(&self, hook: F) -> &Self
    where
        F: Fn(&User, &str, Option<&Resource>) -> O + Send + Sync + 'static,
        O: Into<GateOutcome>,
    {
        let hook = move |user: &User, ability: &str, resource: Option<&Resource>| -> GateOutcome {
            hook(user, ability, resource).into()
        };
        self.before.write().push(Arc::new(hook));
        self
    }

    /// Register a hook that runs after the ability rule
    pub fn after<F, O>(&self, hook: F) -> &Self
    where
        F: Fn(&User, &str, GateOutcome, Option<&Resource>) -> O + Send + Sync + 'static,
        O: Into<GateOutcome>,
    {
        let hook = move |user: &User,
                         ability: &str,
                         provisional: GateOutcome,
                         resource: Option<&Resource>|
              -> GateOutcome { hook(user, ability, provisional, resource).into() };
        self.after.write().push(Arc::new(hook));
        self
    }

    /// Register `{name}.viewAny`, `{name}.view`, ... `{name}.forceDelete`,
    /// each delegating to the matching policy method
    pub fn resource<P>(&self, name: &str, policy: P) -> &Self
    where
        P: ResourcePolicy + 'static,
    {
        let policy: Arc<dyn ResourcePolicy> = Arc::new(policy);
        for ability in ResourceAbility::ALL {
            self.define_rule(
                format!("{}.{}", name, ability.as_str()),
                PolicyRule::new(policy.clone(), ability),
            );
        }
        self
    }

    /// Evaluate an ability.
    ///
    /// Returns [`GateOutcome::Undecided`] when no before hook decides and no
    /// rule is registered for the ability.
    pub fn check(&self, ability: &str, user: &User, resource: Option<&Resource>) -> GateOutcome {
        let before: Vec<Arc<dyn BeforeHook>> = self.before.read().clone();
        for hook in &before {
            let outcome = hook.before(user, ability, resource);
            if outcome.is_decisive() {
                debug!(ability, ?outcome, "Before hook decided");
                return outcome;
            }
        }

        let Some(rule) = self.rules.read().get(ability).cloned() else {
            return GateOutcome::Undecided;
        };

        let mut result = rule.evaluate(user, resource);

        let after: Vec<Arc<dyn AfterHook>> = self.after.read().clone();
        for hook in &after {
            let outcome = hook.after(user, ability, result, resource);
            if outcome.is_decisive() {
                result = outcome;
            }
        }

        debug!(ability, outcome = ?result, "Gate evaluated");
        result
    }

    /// Whether a rule is registered for the ability
    pub fn has(&self, ability: &str) -> bool {
        self.rules.read().contains_key(ability)
    }

    /// Registered abilities, sorted
    pub fn abilities(&self) -> Vec<String> {
        let mut abilities: Vec<String> = self.rules.read().keys().cloned().collect();
        abilities.sort();
        abilities
    }

    /// Remove the rule for an ability
    pub fn forget(&self, ability: &str) {
        self.rules.write().remove(ability);
    }

    /// Remove every rule and hook
    pub fn clear(&self) {
        self.rules.write().clear();
        self.before.write().clear();
        self.after.write().clear();
    }
}

impl fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateRegistry")
            .field("abilities", &self.abilities())
            .field("before_hooks", &self.before.read().len())
            .field("after_hooks", &self.after.read().len())
            .finish()
    }
}
