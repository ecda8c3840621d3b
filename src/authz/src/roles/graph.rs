//! Role hierarchy traversal and effective permissions

use crate::engine::cache::PermissionCache;
use crate::error::{AuthzError, Result};
use permit_core::{Permission, PermissionId, Role, RoleId, Store};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// View over the role forest stored in a [`Store`].
///
/// Traversals follow parent references with a visited set, so they
/// terminate even if the stored data contains a cycle.
#[derive(Clone)]
pub struct RoleGraph {
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
    hierarchy: bool,
}

impl RoleGraph {
    /// Create a graph over `store`; `hierarchy` controls permission inheritance
    pub fn new(store: Arc<dyn Store>, cache: Arc<PermissionCache>, hierarchy: bool) -> Self {
        Self {
            store,
            cache,
            hierarchy,
        }
    }

    /// Whether ancestors contribute to effective permissions
    pub fn hierarchy_enabled(&self) -> bool {
        self.hierarchy
    }

    /// Parent of a role
    pub async fn parent(&self, role: &Role) -> Result<Option<Role>> {
        match role.parent_id {
            Some(id) => Ok(self.store.role(id).await?),
            None => Ok(None),
        }
    }

    /// Direct children of a role
    pub async fn children(&self, role: &Role) -> Result<Vec<Role>> {
        Ok(self.store.child_roles(role.id).await?)
    }

    /// Parent chain of a role, nearest first
    pub async fn ancestors(&self, role: &Role) -> Result<Vec<Role>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([role.id]);
        let mut next = role.parent_id;

        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                warn!(role = %role.slug, parent = %parent_id, "Cycle in role hierarchy");
                break;
            }
            let Some(parent) = self.store.role(parent_id).await? else {
                break;
            };
            next = parent.parent_id;
            chain.push(parent);
        }

        Ok(chain)
    }

    /// Every transitive child of a role, depth-first pre-order
    pub async fn descendants(&self, role: &Role) -> Result<Vec<Role>> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([role.id]);
        let mut stack: Vec<Role> = self.children(role).await?.into_iter().rev().collect();

        while let Some(child) = stack.pop() {
            if !visited.insert(child.id) {
                warn!(role = %role.slug, child = %child.slug, "Cycle in role hierarchy");
                continue;
            }
            let grandchildren = self.children(&child).await?;
            stack.extend(grandchildren.into_iter().rev());
            found.push(child);
        }

        Ok(found)
    }

    /// Permissions attached directly to a role
    pub async fn direct_permissions(&self, role: &Role) -> Result<Vec<Permission>> {
        Ok(self.store.role_permissions(role.id).await?)
    }

    /// Direct permissions plus, with hierarchy enabled, those of every
    /// ancestor; deduplicated by slug, nearest role first
    pub async fn effective_permissions(&self, role: &Role) -> Result<Vec<Permission>> {
        let mut seen = HashSet::new();
        let mut permissions: Vec<Permission> = self
            .direct_permissions(role)
            .await?
            .into_iter()
            .filter(|p| seen.insert(p.slug.clone()))
            .collect();

        if self.hierarchy {
            for ancestor in self.ancestors(role).await? {
                for permission in self.direct_permissions(&ancestor).await? {
                    if seen.insert(permission.slug.clone()) {
                        permissions.push(permission);
                    }
                }
            }
        }

        Ok(permissions)
    }

    /// Whether the role's effective set contains `slug`
    pub async fn has_permission(&self, role: &Role, slug: &str) -> Result<bool> {
        Ok(self
            .effective_permissions(role)
            .await?
            .iter()
            .any(|p| p.slug == slug))
    }

    /// Whether `slug` is attached to the role itself
    pub async fn has_direct_permission(&self, role: &Role, slug: &str) -> Result<bool> {
        Ok(self
            .direct_permissions(role)
            .await?
            .iter()
            .any(|p| p.slug == slug))
    }

    /// Attach a permission to a role.
    ///
    /// Returns `false` if it was already attached.
    pub async fn give_permission(&self, role: &Role, slug: &str) -> Result<bool> {
        let Some(permission) = self.store.permission_by_slug(slug).await? else {
            return Err(AuthzError::InvalidArgument(format!(
                "Permission '{}' does not exist.",
                slug
            )));
        };

        let attached = self.store.attach_permission(role.id, permission.id).await?;
        if attached {
            debug!(role = %role.slug, permission = %slug, "Permission attached");
            self.cache.invalidate();
        }
        Ok(attached)
    }

    /// Detach a permission from a role; unknown slugs are ignored
    pub async fn revoke_permission(&self, role: &Role, slug: &str) -> Result<bool> {
        let Some(permission) = self.store.permission_by_slug(slug).await? else {
            return Ok(false);
        };

        let detached = self.store.detach_permission(role.id, permission.id).await?;
        if detached {
            debug!(role = %role.slug, permission = %slug, "Permission detached");
            self.cache.invalidate();
        }
        Ok(detached)
    }

    /// Replace the role's direct permissions with exactly `slugs`.
    ///
    /// Every slug is resolved before anything is written.
    pub async fn sync_permissions<S>(&self, role: &Role, slugs: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        let mut ids: Vec<PermissionId> = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let slug = slug.as_ref();
            match self.store.permission_by_slug(slug).await? {
                Some(permission) => ids.push(permission.id),
                None => {
                    return Err(AuthzError::InvalidArgument(format!(
                        "Permission '{}' does not exist.",
                        slug
                    )))
                }
            }
        }

        self.store.replace_role_permissions(role.id, &ids).await?;
        self.cache.invalidate();

        debug!(role = %role.slug, count = ids.len(), "Role permissions synced");
        Ok(())
    }

    /// Whether making `parent` the parent of `role` would close a cycle
    pub async fn would_create_cycle(&self, role: RoleId, parent: RoleId) -> Result<bool> {
        if role == parent {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut next = Some(parent);
        while let Some(id) = next {
            if id == role {
                return Ok(true);
            }
            if !visited.insert(id) {
                // Existing cycle above `parent` that does not include `role`
                return Ok(false);
            }
            next = match self.store.role(id).await? {
                Some(current) => current.parent_id,
                None => None,
            };
        }

        Ok(false)
    }
}
