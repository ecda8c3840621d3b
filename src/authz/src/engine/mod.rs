//! Authorization engine
//!
//! Resolves a user's authorization snapshot (roles with ancestors, role
//! permissions, direct grants and denies), then runs the layered decision
//! procedure over it.
//!
//! # Architecture
//!
//! ```text
//! can(user, ability, resource)
//!     │
//!     ▼
//! [Cache] ─miss─▶ Store (user roles → ancestors → role permissions → direct rows)
//!     │
//!     ▼
//! super-admin ─▶ explicit deny ─▶ gates ─▶ explicit grant ─▶ roles ─▶ default deny
//!     │                                                                    │
//!     └──────────────────────────▶ [Metrics] ◀────────────────────────────┘
//! ```

pub mod cache;
pub mod decision;
pub mod metrics;

pub use cache::{CacheStats, PermissionCache, UserSnapshot};
pub use decision::{Decision, DecisionSource};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::builder::{PermissionBuilder, RoleBuilder};
use crate::config::PermitConfig;
use crate::error::{AuthzError, Result};
use crate::gate::{GateOutcome, GateRegistry};
use crate::permissions::PermissionIndex;
use crate::roles::{RoleGraph, RoleManager};
use crate::sync::{RoleDefinitions, SyncEngine, SyncReport};
use permit_core::{
    Permission, PermissionType, Resource, Role, RoleId, SessionProvider, Store, User, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// RBAC and gate authorization engine.
///
/// `Send + Sync`; share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use permit_authz::engine::{DecisionSource, PermitEngine};
/// use permit_authz::store::InMemoryStore;
/// use permit_core::{User, UserId};
/// use std::sync::Arc;
///
/// # async fn example() -> permit_authz::Result<()> {
/// let engine = PermitEngine::new(Arc::new(InMemoryStore::new()));
/// engine.role().slug("editor").permission("posts.update").create().await?;
///
/// let alice = User::new("alice");
/// engine.assign_role(&alice.id, "editor").await?;
///
/// let decision = engine.check(&alice, "posts.update", None).await?;
/// assert!(decision.allowed);
/// assert_eq!(decision.source, DecisionSource::Role);
///
/// engine.deny_permission_to(&alice.id, "posts.update").await?;
/// assert!(engine.cannot(&alice, "posts.update", None).await?);
/// # Ok(())
/// # }
/// ```
pub struct PermitEngine {
    store: Arc<dyn Store>,
    config: PermitConfig,
    graph: RoleGraph,
    roles: RoleManager,
    permissions: PermissionIndex,
    gates: Arc<GateRegistry>,
    cache: Arc<PermissionCache>,
    metrics: Arc<MetricsCollector>,
    session: Option<Arc<dyn SessionProvider>>,
}

impl PermitEngine {
    /// Create an engine with the default configuration
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::build(PermitConfig::default(), store)
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: PermitConfig, store: Arc<dyn Store>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, store))
    }

    /// Attach the provider used by [`authorize`](Self::authorize)
    pub fn with_session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    fn build(config: PermitConfig, store: Arc<dyn Store>) -> Self {
        let cache = Arc::new(PermissionCache::new(config.cache.clone()));
        let graph = RoleGraph::new(store.clone(), cache.clone(), config.role_hierarchy);
        let roles = RoleManager::new(store.clone(), cache.clone(), graph.clone());
        let permissions = PermissionIndex::new(store.clone(), cache.clone());

        info!(
            super_admin_role = %config.super_admin_role,
            role_hierarchy = config.role_hierarchy,
            cache = config.cache.enabled,
            "PermitEngine initialized"
        );

        Self {
            store,
            config,
            graph,
            roles,
            permissions,
            gates: Arc::new(GateRegistry::new()),
            cache,
            metrics: Arc::new(MetricsCollector::new()),
            session: None,
        }
    }

    // ---- decisions ---------------------------------------------------------

    /// Decide an ability and report which layer settled it
    pub async fn check(
        &self,
        user: &User,
        ability: &str,
        resource: Option<&Resource>,
    ) -> Result<Decision> {
        let start = Instant::now();

        let snapshot = self.snapshot(&user.id).await?;
        let (allowed, source) = self.decide(&snapshot, user, ability, resource);
        let decision = Decision::new(user.id.clone(), ability, allowed, source);

        self.metrics.record_decision(&decision, start.elapsed()).await;

        debug!(
            user = %user.id,
            ability,
            allowed,
            source = %source,
            "Authorization decision"
        );
        Ok(decision)
    }

    /// Whether the user may perform the ability
    pub async fn can(&self, user: &User, ability: &str, resource: Option<&Resource>) -> Result<bool> {
        Ok(self.check(user, ability, resource).await?.allowed)
    }

    /// Negation of [`can`](Self::can)
    pub async fn cannot(
        &self,
        user: &User,
        ability: &str,
        resource: Option<&Resource>,
    ) -> Result<bool> {
        Ok(!self.can(user, ability, resource).await?)
    }

    /// Check the ability for the session's current user.
    ///
    /// Fails with `Unauthenticated` when there is no current user and with
    /// `Unauthorized` when the decision is negative.
    pub async fn authorize(&self, ability: &str, resource: Option<&Resource>) -> Result<Decision> {
        let Some(session) = &self.session else {
            return Err(AuthzError::Unauthenticated);
        };
        let Some(user) = session.current_user().await else {
            return Err(AuthzError::Unauthenticated);
        };

        let decision = self.check(&user, ability, resource).await?;
        if !decision.allowed {
            return Err(AuthzError::Unauthorized(ability.to_string()));
        }
        Ok(decision)
    }

    /// Whether the user may perform at least one of the abilities
    pub async fn has_any_permission<S: AsRef<str>>(&self, user: &User, abilities: &[S]) -> Result<bool> {
        for ability in abilities {
            if self.can(user, ability.as_ref(), None).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the user may perform every one of the abilities
    pub async fn has_all_permissions<S: AsRef<str>>(&self, user: &User, abilities: &[S]) -> Result<bool> {
        for ability in abilities {
            if !self.can(user, ability.as_ref(), None).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn decide(
        &self,
        snapshot: &UserSnapshot,
        user: &User,
        ability: &str,
        resource: Option<&Resource>,
    ) -> (bool, DecisionSource) {
        if snapshot.has_role(&self.config.super_admin_role) {
            debug!(user = %user.id, ability, "Super-admin bypass");
            return (true, DecisionSource::SuperAdmin);
        }

        if snapshot.is_denied(ability) {
            debug!(user = %user.id, ability, "Explicit deny");
            return (false, DecisionSource::ExplicitDeny);
        }

        match self.gates.check(ability, user, resource) {
            GateOutcome::Allow => return (true, DecisionSource::Gate),
            GateOutcome::Deny => return (false, DecisionSource::Gate),
            GateOutcome::Undecided => {}
        }

        if snapshot.is_granted(ability) {
            debug!(user = %user.id, ability, "Explicit grant");
            return (true, DecisionSource::ExplicitGrant);
        }

        if snapshot.role_allows(ability) {
            return (true, DecisionSource::Role);
        }

        (false, DecisionSource::Default)
    }

    // ---- snapshots ---------------------------------------------------------

    async fn snapshot(&self, user: &UserId) -> Result<Arc<UserSnapshot>> {
        if let Some(snapshot) = self.cache.get(user) {
            self.metrics.record_cache_hit().await;
            return Ok(snapshot);
        }
        if self.cache.is_enabled() {
            self.metrics.record_cache_miss().await;
        }

        // Captured before loading so a concurrent invalidation discards this result
        let generation = self.cache.generation();
        let snapshot = Arc::new(self.load_snapshot(user).await?);
        self.cache.put(user, generation, snapshot.clone());

        Ok(snapshot)
    }

    async fn load_snapshot(&self, user: &UserId) -> Result<UserSnapshot> {
        let direct = self.store.user_roles(user).await?;

        let mut seen: HashSet<RoleId> = HashSet::new();
        let mut roles: Vec<Role> = Vec::new();
        for role in &direct {
            if seen.insert(role.id) {
                roles.push(role.clone());
            }
            if self.config.role_hierarchy {
                for ancestor in self.graph.ancestors(role).await? {
                    if seen.insert(ancestor.id) {
                        roles.push(ancestor);
                    }
                }
            }
        }

        // `roles` already holds every ancestor, so direct permissions suffice
        let mut slugs: HashSet<String> = HashSet::new();
        let mut role_permissions: Vec<Permission> = Vec::new();
        for role in &roles {
            for permission in self.graph.direct_permissions(role).await? {
                if slugs.insert(permission.slug.clone()) {
                    role_permissions.push(permission);
                }
            }
        }

        let mut grants = Vec::new();
        let mut denies = Vec::new();
        for row in self.store.user_permissions(user).await? {
            match row.kind {
                PermissionType::Grant => grants.push(row.permission),
                PermissionType::Deny => denies.push(row.permission),
            }
        }

        debug!(
            user = %user,
            roles = roles.len(),
            permissions = role_permissions.len(),
            "Loaded authorization snapshot"
        );

        Ok(UserSnapshot {
            direct_roles: direct.into_iter().map(|r| r.slug).collect(),
            roles,
            role_permissions,
            grants,
            denies,
        })
    }

    // ---- queries -----------------------------------------------------------

    /// Direct roles followed by their ancestors (hierarchy enabled),
    /// deduplicated, first-seen order
    pub async fn get_user_roles(&self, user: &UserId) -> Result<Vec<Role>> {
        Ok(self.snapshot(user).await?.roles.clone())
    }

    /// Role permissions plus direct grants minus direct denies, sorted by slug
    pub async fn get_user_permissions(&self, user: &UserId) -> Result<Vec<Permission>> {
        Ok(self.snapshot(user).await?.permissions())
    }

    /// Slugs of [`get_user_permissions`](Self::get_user_permissions)
    pub async fn get_permission_names(&self, user: &UserId) -> Result<Vec<String>> {
        Ok(self
            .get_user_permissions(user)
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect())
    }

    /// Slugs of the roles assigned directly to the user
    pub async fn get_role_names(&self, user: &UserId) -> Result<Vec<String>> {
        Ok(self.snapshot(user).await?.direct_roles.clone())
    }

    /// Whether the user holds the role, directly or through inheritance
    pub async fn has_role(&self, user: &UserId, role: &str) -> Result<bool> {
        Ok(self.snapshot(user).await?.has_role(role))
    }

    pub async fn has_any_role<S: AsRef<str>>(&self, user: &UserId, roles: &[S]) -> Result<bool> {
        let snapshot = self.snapshot(user).await?;
        Ok(roles.iter().any(|role| snapshot.has_role(role.as_ref())))
    }

    pub async fn has_all_roles<S: AsRef<str>>(&self, user: &UserId, roles: &[S]) -> Result<bool> {
        let snapshot = self.snapshot(user).await?;
        Ok(roles.iter().all(|role| snapshot.has_role(role.as_ref())))
    }

    /// Whether the user holds the configured super-admin role
    pub async fn is_super_admin(&self, user: &UserId) -> Result<bool> {
        self.has_role(user, &self.config.super_admin_role).await
    }

    // ---- user mutations ----------------------------------------------------

    pub async fn assign_role(&self, user: &UserId, role: &str) -> Result<()> {
        self.roles.assign_to_user(user, role).await?;
        Ok(())
    }

    pub async fn assign_roles<S: AsRef<str>>(&self, user: &UserId, roles: &[S]) -> Result<()> {
        for role in roles {
            self.roles.assign_to_user(user, role.as_ref()).await?;
        }
        Ok(())
    }

    pub async fn remove_role(&self, user: &UserId, role: &str) -> Result<()> {
        self.roles.revoke_from_user(user, role).await?;
        Ok(())
    }

    /// Replace the user's roles
    pub async fn sync_roles<S: AsRef<str>>(&self, user: &UserId, roles: &[S]) -> Result<()> {
        self.roles.sync_for_user(user, roles).await
    }

    pub async fn give_permission_to(&self, user: &UserId, permission: &str) -> Result<()> {
        self.permissions.grant_to_user(user, permission).await
    }

    pub async fn deny_permission_to(&self, user: &UserId, permission: &str) -> Result<()> {
        self.permissions.deny_to_user(user, permission).await
    }

    pub async fn revoke_permission_to(&self, user: &UserId, permission: &str) -> Result<()> {
        self.permissions.revoke_from_user(user, permission).await?;
        Ok(())
    }

    /// Replace the user's direct grants and denies
    pub async fn sync_user_permissions<G, D>(
        &self,
        user: &UserId,
        grants: &[G],
        denies: &[D],
    ) -> Result<()>
    where
        G: AsRef<str>,
        D: AsRef<str>,
    {
        self.permissions.sync_for_user(user, grants, denies).await
    }

    // ---- components --------------------------------------------------------

    pub fn roles(&self) -> &RoleManager {
        &self.roles
    }

    pub fn graph(&self) -> &RoleGraph {
        &self.graph
    }

    pub fn permissions(&self) -> &PermissionIndex {
        &self.permissions
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Start building a role
    pub fn role(&self) -> RoleBuilder {
        RoleBuilder::new(
            self.roles.clone(),
            self.graph.clone(),
            self.permissions.clone(),
        )
    }

    /// Start building a permission
    pub fn permission(&self) -> PermissionBuilder {
        PermissionBuilder::new(self.permissions.clone())
    }

    pub fn config(&self) -> &PermitConfig {
        &self.config
    }

    /// Snapshot of decision metrics
    pub async fn metrics(&self) -> EngineMetrics {
        self.metrics.get_metrics().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every memoized snapshot
    pub fn clear_cache(&self) {
        self.cache.invalidate();
        debug!("Permission cache cleared");
    }

    // ---- sync --------------------------------------------------------------

    /// Reconcile roles and their permissions with `definitions`
    pub async fn sync(&self, definitions: &RoleDefinitions) -> SyncReport {
        SyncEngine::new(
            self.roles.clone(),
            self.graph.clone(),
            self.permissions.clone(),
            self.cache.clone(),
        )
        .run(definitions)
        .await
    }

    /// [`sync`](Self::sync) from a JSON object keyed by role slug
    pub async fn sync_json(&self, json: &str) -> Result<SyncReport> {
        let definitions = RoleDefinitions::from_json(json)?;
        Ok(self.sync(&definitions).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    async fn engine_with(config: PermitConfig) -> PermitEngine {
        let engine = PermitEngine::with_config(config, Arc::new(InMemoryStore::new())).unwrap();
        engine
            .role()
            .slug("editor")
            .permissions(["posts.view", "posts.update"])
            .create()
            .await
            .unwrap();
        engine.role().slug("super-admin").create().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_decision_sources() {
        let engine = engine_with(PermitConfig::default()).await;
        let alice = User::new("alice");
        engine.assign_role(&alice.id, "editor").await.unwrap();

        let decision = engine.check(&alice, "posts.view", None).await.unwrap();
        assert_eq!(decision.source, DecisionSource::Role);
        assert!(decision.allowed);

        let decision = engine.check(&alice, "posts.delete", None).await.unwrap();
        assert_eq!(decision.source, DecisionSource::Default);
        assert!(!decision.allowed);

        engine.deny_permission_to(&alice.id, "posts.view").await.unwrap();
        let decision = engine.check(&alice, "posts.view", None).await.unwrap();
        assert_eq!(decision.source, DecisionSource::ExplicitDeny);

        engine.assign_role(&alice.id, "super-admin").await.unwrap();
        let decision = engine.check(&alice, "posts.view", None).await.unwrap();
        assert_eq!(decision.source, DecisionSource::SuperAdmin);
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_custom_super_admin_role() {
        let config = PermitConfig {
            super_admin_role: "root".to_string(),
            ..Default::default()
        };
        let engine = engine_with(config).await;
        engine.role().slug("root").create().await.unwrap();

        let bob = User::new("bob");
        engine.assign_role(&bob.id, "super-admin").await.unwrap();
        assert!(!engine.can(&bob, "anything", None).await.unwrap());

        engine.assign_role(&bob.id, "root").await.unwrap();
        assert!(engine.can(&bob, "anything", None).await.unwrap());
        assert!(engine.is_super_admin(&bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_hits_are_recorded() {
        let engine = engine_with(PermitConfig::default()).await;
        let alice = User::new("alice");
        engine.assign_role(&alice.id, "editor").await.unwrap();

        engine.can(&alice, "posts.view", None).await.unwrap();
        engine.can(&alice, "posts.update", None).await.unwrap();

        let metrics = engine.metrics().await;
        assert_eq!(metrics.total_checks, 2);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(engine.cache_stats().entries, 1);

        engine.clear_cache();
        engine.clear_cache();
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = PermitConfig {
            super_admin_role: String::new(),
            ..Default::default()
        };
        let result = PermitEngine::with_config(config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(AuthzError::Configuration(_))));
    }
}
