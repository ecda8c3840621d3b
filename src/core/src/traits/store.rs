//! Persistence abstraction for roles, permissions and their associations

use crate::error::Result;
use crate::types::{
    DirectPermission, NewPermission, NewRole, Permission, PermissionId, PermissionType, Role,
    RoleId, UserId,
};
use async_trait::async_trait;

/// Storage backend for the authorization engine.
///
/// Implementations must enforce:
/// - unique role slugs and permission slugs (`StoreError::Conflict`),
/// - unique (role, permission), (user, role) and (user, permission) pairs,
/// - cascading cleanup on role and permission removal,
/// - atomicity of the `replace_*` operations: a concurrent reader sees either
///   the previous association set or the new one, never a partial one.
#[async_trait]
pub trait Store: Send + Sync {
    // ---- roles -------------------------------------------------------------

    /// Insert a role, failing with `Conflict` if the slug is taken
    async fn insert_role(&self, role: NewRole) -> Result<Role>;

    /// Persist changed role fields, failing with `NotFound` or `Conflict`
    async fn update_role(&self, role: &Role) -> Result<Role>;

    /// Delete a role.
    ///
    /// Children become roots; user-role and role-permission rows referencing
    /// the role are removed. Returns `false` if the role did not exist.
    async fn delete_role(&self, id: RoleId) -> Result<bool>;

    /// Get a role by ID
    async fn role(&self, id: RoleId) -> Result<Option<Role>>;

    /// Get a role by slug
    async fn role_by_slug(&self, slug: &str) -> Result<Option<Role>>;

    /// List all roles
    async fn roles(&self) -> Result<Vec<Role>>;

    /// Roles whose parent is `parent`
    async fn child_roles(&self, parent: RoleId) -> Result<Vec<Role>>;

    // ---- permissions -------------------------------------------------------

    /// Insert a permission, failing with `Conflict` if the slug is taken
    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission>;

    /// Persist changed permission fields
    async fn update_permission(&self, permission: &Permission) -> Result<Permission>;

    /// Delete a permission and every association referencing it
    async fn delete_permission(&self, id: PermissionId) -> Result<bool>;

    /// Get a permission by ID
    async fn permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    /// Get a permission by slug
    async fn permission_by_slug(&self, slug: &str) -> Result<Option<Permission>>;

    /// List all permissions
    async fn permissions(&self) -> Result<Vec<Permission>>;

    // ---- role <-> permission -----------------------------------------------

    /// Permissions attached directly to a role
    async fn role_permissions(&self, role: RoleId) -> Result<Vec<Permission>>;

    /// Attach a permission to a role; returns `false` if already attached
    async fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool>;

    /// Detach a permission from a role; returns `false` if it was not attached
    async fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool>;

    /// Atomically replace the permission set of a role
    async fn replace_role_permissions(&self, role: RoleId, permissions: &[PermissionId]) -> Result<()>;

    // ---- user <-> role -----------------------------------------------------

    /// Roles assigned directly to a user
    async fn user_roles(&self, user: &UserId) -> Result<Vec<Role>>;

    /// Assign a role to a user; returns `false` if already assigned
    async fn attach_role(&self, user: &UserId, role: RoleId) -> Result<bool>;

    /// Remove a role from a user; returns `false` if it was not assigned
    async fn detach_role(&self, user: &UserId, role: RoleId) -> Result<bool>;

    /// Atomically replace the roles of a user
    async fn replace_user_roles(&self, user: &UserId, roles: &[RoleId]) -> Result<()>;

    /// Users holding a role directly
    async fn users_with_role(&self, role: RoleId) -> Result<Vec<UserId>>;

    // ---- user <-> permission -----------------------------------------------

    /// Direct grants and denies of a user
    async fn user_permissions(&self, user: &UserId) -> Result<Vec<DirectPermission>>;

    /// Set the direct permission type, replacing any existing row for the pair
    async fn set_user_permission(
        &self,
        user: &UserId,
        permission: PermissionId,
        kind: PermissionType,
    ) -> Result<()>;

    /// Remove the direct permission row for the pair; returns `false` if none
    async fn remove_user_permission(&self, user: &UserId, permission: PermissionId) -> Result<bool>;

    /// Atomically replace every direct permission of a user.
    ///
    /// A permission listed in both `grants` and `denies` ends up denied.
    async fn replace_user_permissions(
        &self,
        user: &UserId,
        grants: &[PermissionId],
        denies: &[PermissionId],
    ) -> Result<()>;
}
