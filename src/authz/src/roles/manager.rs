//! Role CRUD and user-role assignment

use super::graph::RoleGraph;
use crate::engine::cache::PermissionCache;
use crate::error::{AuthzError, Result};
use permit_core::{NewRole, Role, RoleId, Store, UserId};
use std::sync::Arc;
use tracing::info;

/// Role lifecycle and assignment operations.
///
/// Every mutation invalidates the permission cache before returning.
#[derive(Clone)]
pub struct RoleManager {
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
    graph: RoleGraph,
}

impl RoleManager {
    pub fn new(store: Arc<dyn Store>, cache: Arc<PermissionCache>, graph: RoleGraph) -> Self {
        Self {
            store,
            cache,
            graph,
        }
    }

    /// Create a role.
    ///
    /// Fails with `InvalidArgument` on an empty slug and `AlreadyExists` when
    /// the slug is taken.
    pub async fn create(&self, role: NewRole) -> Result<Role> {
        if role.slug.trim().is_empty() {
            return Err(AuthzError::InvalidArgument(
                "Role slug is required.".to_string(),
            ));
        }
        if self.store.role_by_slug(&role.slug).await?.is_some() {
            return Err(AuthzError::AlreadyExists(format!(
                "Role '{}' already exists.",
                role.slug
            )));
        }

        let created = self.store.insert_role(role).await?;
        self.cache.invalidate();

        info!(role = %created.slug, id = %created.id, "Role created");
        Ok(created)
    }

    /// Find a role by slug
    pub async fn find(&self, slug: &str) -> Result<Option<Role>> {
        Ok(self.store.role_by_slug(slug).await?)
    }

    /// Find a role by id
    pub async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.store.role(id).await?)
    }

    /// Find a role by slug, failing with `NotFound`
    pub async fn find_or_fail(&self, slug: &str) -> Result<Role> {
        self.find(slug)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role '{}' not found.", slug)))
    }

    /// All roles, sorted by slug
    pub async fn all(&self) -> Result<Vec<Role>> {
        Ok(self.store.roles().await?)
    }

    /// Persist changed fields of an existing role.
    ///
    /// A new parent is rejected with `InvalidArgument` if it would make the
    /// role its own ancestor.
    pub async fn update(&self, role: &Role) -> Result<Role> {
        let current = self
            .find_by_id(role.id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role '{}' not found.", role.slug)))?;

        if let Some(parent) = role.parent_id {
            let reparented = current.parent_id != Some(parent);
            if reparented && self.graph.would_create_cycle(role.id, parent).await? {
                return Err(AuthzError::InvalidArgument(format!(
                    "Role '{}' cannot inherit from one of its descendants.",
                    role.slug
                )));
            }
        }

        let updated = self.store.update_role(role).await?;
        self.cache.invalidate();

        info!(role = %updated.slug, "Role updated");
        Ok(updated)
    }

    /// Reparent a role; `None` makes it a root
    pub async fn set_parent(&self, role: &Role, parent: Option<&Role>) -> Result<Role> {
        let mut changed = role.clone();
        changed.parent_id = parent.map(|p| p.id);
        self.update(&changed).await
    }

    /// Delete a role by slug.
    ///
    /// Children become roots and every assignment of the role is removed.
    pub async fn delete(&self, slug: &str) -> Result<()> {
        let role = self.find_or_fail(slug).await?;

        self.store.delete_role(role.id).await?;
        self.cache.invalidate();

        info!(role = %slug, "Role deleted");
        Ok(())
    }

    /// Assign a role to a user; unknown slugs fail with `NotFound`
    pub async fn assign_to_user(&self, user: &UserId, slug: &str) -> Result<bool> {
        let role = self.find_or_fail(slug).await?;

        let assigned = self.store.attach_role(user, role.id).await?;
        if assigned {
            self.cache.invalidate();
            info!(user = %user, role = %slug, "Role assigned");
        }
        Ok(assigned)
    }

    /// Remove a role from a user; unknown slugs are ignored
    pub async fn revoke_from_user(&self, user: &UserId, slug: &str) -> Result<bool> {
        let Some(role) = self.find(slug).await? else {
            return Ok(false);
        };

        let removed = self.store.detach_role(user, role.id).await?;
        if removed {
            self.cache.invalidate();
            info!(user = %user, role = %slug, "Role removed");
        }
        Ok(removed)
    }

    /// Replace a user's roles with exactly `slugs`.
    ///
    /// Every slug is resolved before anything is written.
    pub async fn sync_for_user<S>(&self, user: &UserId, slugs: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            ids.push(self.find_or_fail(slug.as_ref()).await?.id);
        }

        self.store.replace_user_roles(user, &ids).await?;
        self.cache.invalidate();

        info!(user = %user, count = ids.len(), "User roles synced");
        Ok(())
    }

    /// Users holding the role directly
    pub async fn users_with_role(&self, slug: &str) -> Result<Vec<UserId>> {
        let role = self.find_or_fail(slug).await?;
        Ok(self.store.users_with_role(role.id).await?)
    }
}
