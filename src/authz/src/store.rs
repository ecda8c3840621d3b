//! In-memory [`Store`] implementation
//!
//! All tables live behind a single `RwLock`, so every operation (including
//! the `replace_*` family and cascading deletes) is atomic with respect to
//! concurrent readers.

use async_trait::async_trait;
use chrono::Utc;
use permit_core::error::{Result, StoreError};
use permit_core::{
    DirectPermission, NewPermission, NewRole, Permission, PermissionId, PermissionType, Role,
    RoleId, Store, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    roles: HashMap<RoleId, Role>,
    role_slugs: HashMap<String, RoleId>,
    permissions: HashMap<PermissionId, Permission>,
    permission_slugs: HashMap<String, PermissionId>,
    /// Insertion-ordered permission ids per role
    role_permissions: HashMap<RoleId, Vec<PermissionId>>,
    /// Insertion-ordered role ids per user
    user_roles: HashMap<UserId, Vec<RoleId>>,
    user_permissions: HashMap<UserId, Vec<(PermissionId, PermissionType)>>,
}

impl Tables {
    fn require_role(&self, id: RoleId) -> Result<&Role> {
        self.roles
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {}", id)))
    }

    fn require_permission(&self, id: PermissionId) -> Result<&Permission> {
        self.permissions
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("permission {}", id)))
    }

    fn resolve_permissions(&self, ids: &[PermissionId]) -> Vec<Permission> {
        ids.iter()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect()
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (role, permission) association rows
    pub async fn role_permission_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.role_permissions.values().map(Vec::len).sum()
    }
}

fn dedup_preserving_order<T: PartialEq + Copy>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(*item);
        }
    }
    out
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_role(&self, role: NewRole) -> Result<Role> {
        let mut tables = self.tables.write().await;

        if tables.role_slugs.contains_key(&role.slug) {
            return Err(StoreError::Conflict(format!("role slug '{}'", role.slug)));
        }
        if let Some(parent) = role.parent_id {
            tables.require_role(parent)?;
        }

        let now = Utc::now();
        let record = Role {
            id: RoleId::new(),
            slug: role.slug,
            name: role.name,
            description: role.description,
            parent_id: role.parent_id,
            created_at: now,
            updated_at: now,
        };

        tables.role_slugs.insert(record.slug.clone(), record.id);
        tables.roles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_role(&self, role: &Role) -> Result<Role> {
        let mut tables = self.tables.write().await;

        let previous_slug = tables.require_role(role.id)?.slug.clone();
        if previous_slug != role.slug && tables.role_slugs.contains_key(&role.slug) {
            return Err(StoreError::Conflict(format!("role slug '{}'", role.slug)));
        }
        if let Some(parent) = role.parent_id {
            tables.require_role(parent)?;
        }

        let mut updated = role.clone();
        updated.updated_at = Utc::now();

        tables.role_slugs.remove(&previous_slug);
        tables.role_slugs.insert(updated.slug.clone(), updated.id);
        tables.roles.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let Some(removed) = tables.roles.remove(&id) else {
            return Ok(false);
        };
        tables.role_slugs.remove(&removed.slug);

        // Children become roots
        let now = Utc::now();
        for role in tables.roles.values_mut() {
            if role.parent_id == Some(id) {
                role.parent_id = None;
                role.updated_at = now;
            }
        }

        tables.role_permissions.remove(&id);
        for roles in tables.user_roles.values_mut() {
            roles.retain(|r| *r != id);
        }

        Ok(true)
    }

    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).cloned())
    }

    async fn role_by_slug(&self, slug: &str) -> Result<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_slugs
            .get(slug)
            .and_then(|id| tables.roles.get(id))
            .cloned())
    }

    async fn roles(&self) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(roles)
    }

    async fn child_roles(&self, parent: RoleId) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut children: Vec<Role> = tables
            .roles
            .values()
            .filter(|r| r.parent_id == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(children)
    }

    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        let mut tables = self.tables.write().await;

        if tables.permission_slugs.contains_key(&permission.slug) {
            return Err(StoreError::Conflict(format!(
                "permission slug '{}'",
                permission.slug
            )));
        }

        let now = Utc::now();
        let record = Permission {
            id: PermissionId::new(),
            slug: permission.slug,
            name: permission.name,
            description: permission.description,
            group: permission.group,
            created_at: now,
            updated_at: now,
        };

        tables.permission_slugs.insert(record.slug.clone(), record.id);
        tables.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_permission(&self, permission: &Permission) -> Result<Permission> {
        let mut tables = self.tables.write().await;

        let previous_slug = tables.require_permission(permission.id)?.slug.clone();
        if previous_slug != permission.slug && tables.permission_slugs.contains_key(&permission.slug) {
            return Err(StoreError::Conflict(format!(
                "permission slug '{}'",
                permission.slug
            )));
        }

        let mut updated = permission.clone();
        updated.updated_at = Utc::now();

        tables.permission_slugs.remove(&previous_slug);
        tables.permission_slugs.insert(updated.slug.clone(), updated.id);
        tables.permissions.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let Some(removed) = tables.permissions.remove(&id) else {
            return Ok(false);
        };
        tables.permission_slugs.remove(&removed.slug);

        for permissions in tables.role_permissions.values_mut() {
            permissions.retain(|p| *p != id);
        }
        for rows in tables.user_permissions.values_mut() {
            rows.retain(|(p, _)| *p != id);
        }

        Ok(true)
    }

    async fn permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables.permissions.get(&id).cloned())
    }

    async fn permission_by_slug(&self, slug: &str) -> Result<Option<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permission_slugs
            .get(slug)
            .and_then(|id| tables.permissions.get(id))
            .cloned())
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        let tables = self.tables.read().await;
        let mut permissions: Vec<Permission> = tables.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(permissions)
    }

    async fn role_permissions(&self, role: RoleId) -> Result<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_permissions
            .get(&role)
            .map(|ids| tables.resolve_permissions(ids))
            .unwrap_or_default())
    }

    async fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        tables.require_role(role)?;
        tables.require_permission(permission)?;

        let attached = tables.role_permissions.entry(role).or_default();
        if attached.contains(&permission) {
            return Ok(false);
        }
        attached.push(permission);
        Ok(true)
    }

    async fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(attached) = tables.role_permissions.get_mut(&role) else {
            return Ok(false);
        };
        let before = attached.len();
        attached.retain(|p| *p != permission);
        Ok(attached.len() != before)
    }

    async fn replace_role_permissions(&self, role: RoleId, permissions: &[PermissionId]) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.require_role(role)?;
        for id in permissions {
            tables.require_permission(*id)?;
        }

        tables
            .role_permissions
            .insert(role, dedup_preserving_order(permissions));
        Ok(())
    }

    async fn user_roles(&self, user: &UserId) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_roles
            .get(user)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.roles.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn attach_role(&self, user: &UserId, role: RoleId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        tables.require_role(role)?;

        let assigned = tables.user_roles.entry(user.clone()).or_default();
        if assigned.contains(&role) {
            return Ok(false);
        }
        assigned.push(role);
        Ok(true)
    }

    async fn detach_role(&self, user: &UserId, role: RoleId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(assigned) = tables.user_roles.get_mut(user) else {
            return Ok(false);
        };
        let before = assigned.len();
        assigned.retain(|r| *r != role);
        Ok(assigned.len() != before)
    }

    async fn replace_user_roles(&self, user: &UserId, roles: &[RoleId]) -> Result<()> {
        let mut tables = self.tables.write().await;
        for id in roles {
            tables.require_role(*id)?;
        }

        tables
            .user_roles
            .insert(user.clone(), dedup_preserving_order(roles));
        Ok(())
    }

    async fn users_with_role(&self, role: RoleId) -> Result<Vec<UserId>> {
        let tables = self.tables.read().await;
        let mut users: Vec<UserId> = tables
            .user_roles
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn user_permissions(&self, user: &UserId) -> Result<Vec<DirectPermission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_permissions
            .get(user)
            .map(|rows| {
                rows.iter()
                    .filter_map(|(id, kind)| {
                        tables.permissions.get(id).map(|p| DirectPermission {
                            permission: p.clone(),
                            kind: *kind,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_user_permission(
        &self,
        user: &UserId,
        permission: PermissionId,
        kind: PermissionType,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.require_permission(permission)?;

        let rows = tables.user_permissions.entry(user.clone()).or_default();
        rows.retain(|(p, _)| *p != permission);
        rows.push((permission, kind));
        Ok(())
    }

    async fn remove_user_permission(&self, user: &UserId, permission: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.user_permissions.get_mut(user) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|(p, _)| *p != permission);
        Ok(rows.len() != before)
    }

    async fn replace_user_permissions(
        &self,
        user: &UserId,
        grants: &[PermissionId],
        denies: &[PermissionId],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        for id in grants.iter().chain(denies) {
            tables.require_permission(*id)?;
        }

        let mut rows: Vec<(PermissionId, PermissionType)> = Vec::new();
        for (ids, kind) in [(grants, PermissionType::Grant), (denies, PermissionType::Deny)] {
            for id in ids {
                rows.retain(|(p, _)| p != id);
                rows.push((*id, kind));
            }
        }

        tables.user_permissions.insert(user.clone(), rows);
        Ok(())
    }
}
