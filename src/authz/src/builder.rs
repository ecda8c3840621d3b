//! Fluent builders for roles and permissions
//!
//! # Example
//!
//! ```rust
//! use permit_authz::engine::PermitEngine;
//! use permit_authz::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> permit_authz::Result<()> {
//! let engine = PermitEngine::new(Arc::new(InMemoryStore::new()));
//!
//! engine.role().slug("user").permissions(["profile.view", "profile.update"]).create().await?;
//! let moderator = engine
//!     .role()
//!     .slug("moderator")
//!     .inherits("user")
//!     .permission("content.moderate")
//!     .assign("alice")
//!     .create()
//!     .await?;
//!
//! assert_eq!(moderator.name, "Moderator");
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthzError, Result};
use crate::permissions::{validate_slug, PermissionIndex};
use crate::roles::{default_role_name, RoleGraph, RoleManager};
use permit_core::{NewPermission, NewRole, Permission, Role, RoleId, UserId};
use tracing::debug;

/// Builder for creating or updating a role
#[derive(Clone)]
pub struct RoleBuilder {
    roles: RoleManager,
    graph: RoleGraph,
    permissions: PermissionIndex,
    id: Option<RoleId>,
    slug: Option<String>,
    name: Option<String>,
    description: Option<String>,
    inherits: Option<String>,
    permission_slugs: Vec<String>,
    assign_to: Option<UserId>,
}

impl RoleBuilder {
    pub fn new(roles: RoleManager, graph: RoleGraph, permissions: PermissionIndex) -> Self {
        Self {
            roles,
            graph,
            permissions,
            id: None,
            slug: None,
            name: None,
            description: None,
            inherits: None,
            permission_slugs: Vec::new(),
            assign_to: None,
        }
    }

    /// Identify the role to update by id
    pub fn id(mut self, id: RoleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parent role slug
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(parent.into());
        self
    }

    /// Replace the permission list
    pub fn permissions<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permission_slugs = slugs.into_iter().map(Into::into).collect();
        self
    }

    /// Append one permission
    pub fn permission(mut self, slug: impl Into<String>) -> Self {
        self.permission_slugs.push(slug.into());
        self
    }

    /// Assign the role to a user once it is saved
    pub fn assign(mut self, user: impl Into<UserId>) -> Self {
        self.assign_to = Some(user.into());
        self
    }

    /// Create the role.
    ///
    /// Permissions are found or created, then attached. Fails with
    /// `InvalidArgument` without a slug or with an unknown parent, and with
    /// `AlreadyExists` when the slug is taken.
    pub async fn create(self) -> Result<Role> {
        let slug = self.required_slug()?.to_string();
        if self.roles.find(&slug).await?.is_some() {
            return Err(AuthzError::AlreadyExists(format!(
                "Role '{}' already exists.",
                slug
            )));
        }
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| default_role_name(&slug));

        let mut new_role = NewRole::new(slug, name);
        new_role.description = self.description.clone();
        new_role.parent_id = self.resolve_parent().await?;

        // Nothing is written for the role until every reference resolves
        let permissions = self.resolve_permissions().await?;
        let role = self.roles.create(new_role).await?;

        for permission in permissions {
            self.graph.give_permission(&role, &permission.slug).await?;
        }
        if let Some(user) = &self.assign_to {
            self.roles.assign_to_user(user, &role.slug).await?;
        }

        Ok(role)
    }

    /// Return the existing role with the slug, or create it.
    ///
    /// An existing role is returned untouched.
    pub async fn find_or_create(self) -> Result<Role> {
        let slug = self.required_slug()?;
        if let Some(existing) = self.roles.find(slug).await? {
            debug!(role = %slug, "Role already exists");
            return Ok(existing);
        }
        self.create().await
    }

    /// Update the role identified by `id` (or else `slug`).
    ///
    /// Only fields set on the builder are overwritten. A non-empty permission
    /// list replaces the role's direct permissions.
    pub async fn update(self) -> Result<Role> {
        let mut role = match (self.id, self.slug.as_deref()) {
            (Some(id), _) => self.roles.find_by_id(id).await?.ok_or_else(|| {
                AuthzError::NotFound(format!("Role '{}' not found for update.", id))
            })?,
            (None, Some(slug)) => self.roles.find(slug).await?.ok_or_else(|| {
                AuthzError::NotFound(format!("Role '{}' not found for update.", slug))
            })?,
            (None, None) => {
                return Err(AuthzError::InvalidArgument(
                    "Role ID or Slug is required for update.".to_string(),
                ))
            }
        };

        if let Some(slug) = &self.slug {
            role.slug = slug.clone();
        }
        if let Some(name) = &self.name {
            role.name = name.clone();
        }
        if let Some(description) = &self.description {
            role.description = Some(description.clone());
        }
        if let Some(parent) = self.resolve_parent().await? {
            role.parent_id = Some(parent);
        }

        let slugs: Vec<String> = self
            .resolve_permissions()
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect();

        let role = self.roles.update(&role).await?;

        if !slugs.is_empty() {
            self.graph.sync_permissions(&role, slugs.as_slice()).await?;
        }
        if let Some(user) = &self.assign_to {
            self.roles.assign_to_user(user, &role.slug).await?;
        }

        Ok(role)
    }

    fn required_slug(&self) -> Result<&str> {
        match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => Ok(slug),
            _ => Err(AuthzError::InvalidArgument(
                "Role slug is required.".to_string(),
            )),
        }
    }

    async fn resolve_parent(&self) -> Result<Option<RoleId>> {
        let Some(parent) = &self.inherits else {
            return Ok(None);
        };
        match self.roles.find(parent).await? {
            Some(role) => Ok(Some(role.id)),
            None => Err(AuthzError::InvalidArgument(format!(
                "Parent role '{}' does not exist.",
                parent
            ))),
        }
    }

    /// Find or create every listed permission; blank slugs fail before any write
    async fn resolve_permissions(&self) -> Result<Vec<Permission>> {
        for slug in &self.permission_slugs {
            validate_slug(slug)?;
        }

        let mut resolved = Vec::with_capacity(self.permission_slugs.len());
        for slug in &self.permission_slugs {
            resolved.push(self.permissions.find_or_create(slug, None, None).await?);
        }
        Ok(resolved)
    }
}

/// Builder for creating a permission
#[derive(Clone)]
pub struct PermissionBuilder {
    permissions: PermissionIndex,
    slug: Option<String>,
    name: Option<String>,
    description: Option<String>,
    group: Option<String>,
}

impl PermissionBuilder {
    pub fn new(permissions: PermissionIndex) -> Self {
        Self {
            permissions,
            slug: None,
            name: None,
            description: None,
            group: None,
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Create the permission; the name defaults to one derived from the slug
    pub async fn create(self) -> Result<Permission> {
        let permission = self.definition()?;
        self.permissions.create(permission).await
    }

    /// Return the existing permission with the slug, or create it
    pub async fn find_or_create(self) -> Result<Permission> {
        let permission = self.definition()?;
        self.permissions.create_many([permission]).await.and_then(|mut created| {
            created
                .pop()
                .ok_or_else(|| AuthzError::Store("permission was not created".to_string()))
        })
    }

    fn definition(&self) -> Result<NewPermission> {
        let slug = match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => slug,
            _ => {
                return Err(AuthzError::InvalidArgument(
                    "Permission slug is required.".to_string(),
                ))
            }
        };

        Ok(NewPermission {
            slug: slug.to_string(),
            name: self.name.clone().unwrap_or_default(),
            description: self.description.clone(),
            group: self.group.clone(),
        })
    }
}
