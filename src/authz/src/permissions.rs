//! Permission lookup, creation and per-user overrides

use crate::engine::cache::PermissionCache;
use crate::error::{AuthzError, Result};
use permit_core::{
    DirectPermission, NewPermission, Permission, PermissionId, PermissionType, Store, UserId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Group assigned to permissions without one in [`PermissionIndex::grouped`]
pub const DEFAULT_GROUP: &str = "general";

/// Display name derived from a slug.
///
/// `-`, `_` and `.` become spaces and every word is capitalised:
/// `users.delete` becomes `Users Delete`.
pub fn name_from_slug(slug: &str) -> String {
    let mut name = String::with_capacity(slug.len());
    let mut word_start = true;

    for c in slug.chars() {
        match c {
            '-' | '_' | '.' | ' ' => {
                name.push(' ');
                word_start = true;
            }
            _ if word_start => {
                name.extend(c.to_uppercase());
                word_start = false;
            }
            _ => name.push(c),
        }
    }

    name
}

/// Permission catalogue and direct user grants/denies.
///
/// Every mutation invalidates the permission cache before returning.
#[derive(Clone)]
pub struct PermissionIndex {
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
}

impl PermissionIndex {
    pub fn new(store: Arc<dyn Store>, cache: Arc<PermissionCache>) -> Self {
        Self { store, cache }
    }

    /// Find a permission by slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Permission>> {
        Ok(self.store.permission_by_slug(slug).await?)
    }

    /// Find a permission by slug, failing with `NotFound`
    pub async fn find_or_fail(&self, slug: &str) -> Result<Permission> {
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Permission '{}' not found.", slug)))
    }

    /// Return the permission with `slug`, creating it if absent.
    ///
    /// A missing name is derived with [`name_from_slug`].
    pub async fn find_or_create(
        &self,
        slug: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Permission> {
        let mut permission = NewPermission::new(slug, name.unwrap_or_default());
        permission.description = description.map(str::to_string);
        self.find_or_insert(permission).await
    }

    /// Create a permission.
    ///
    /// Fails with `InvalidArgument` on an empty slug and `AlreadyExists` when
    /// the slug is taken. An empty name is derived from the slug.
    pub async fn create(&self, mut permission: NewPermission) -> Result<Permission> {
        validate_slug(&permission.slug)?;
        if self.find_by_slug(&permission.slug).await?.is_some() {
            return Err(AuthzError::AlreadyExists(format!(
                "Permission '{}' already exists.",
                permission.slug
            )));
        }
        if permission.name.trim().is_empty() {
            permission.name = name_from_slug(&permission.slug);
        }

        let created = self.store.insert_permission(permission).await?;
        self.cache.invalidate();

        info!(permission = %created.slug, "Permission created");
        Ok(created)
    }

    /// Find-or-create every entry, in order
    pub async fn create_many<I>(&self, entries: I) -> Result<Vec<Permission>>
    where
        I: IntoIterator<Item = NewPermission>,
    {
        let mut permissions = Vec::new();
        for entry in entries {
            permissions.push(self.find_or_insert(entry).await?);
        }
        Ok(permissions)
    }

    /// All permissions, sorted by slug
    pub async fn all(&self) -> Result<Vec<Permission>> {
        Ok(self.store.permissions().await?)
    }

    /// Permissions bucketed by group; ungrouped ones go to `general`
    pub async fn grouped(&self) -> Result<BTreeMap<String, Vec<Permission>>> {
        let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in self.all().await? {
            let group = permission
                .group
                .clone()
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP.to_string());
            groups.entry(group).or_default().push(permission);
        }
        Ok(groups)
    }

    /// Persist changed fields of an existing permission
    pub async fn update(&self, permission: &Permission) -> Result<Permission> {
        validate_slug(&permission.slug)?;
        let updated = self.store.update_permission(permission).await?;
        self.cache.invalidate();

        info!(permission = %updated.slug, "Permission updated");
        Ok(updated)
    }

    /// Delete a permission and every role and user association to it
    pub async fn delete(&self, slug: &str) -> Result<()> {
        let permission = self.find_or_fail(slug).await?;

        self.store.delete_permission(permission.id).await?;
        self.cache.invalidate();

        info!(permission = %slug, "Permission deleted");
        Ok(())
    }

    /// Direct grants and denies of a user
    pub async fn for_user(&self, user: &UserId) -> Result<Vec<DirectPermission>> {
        Ok(self.store.user_permissions(user).await?)
    }

    /// Grant a permission directly, replacing a deny for the same permission
    pub async fn grant_to_user(&self, user: &UserId, slug: &str) -> Result<()> {
        self.set_for_user(user, slug, PermissionType::Grant).await
    }

    /// Deny a permission directly, replacing a grant for the same permission
    pub async fn deny_to_user(&self, user: &UserId, slug: &str) -> Result<()> {
        self.set_for_user(user, slug, PermissionType::Deny).await
    }

    /// Remove the direct grant or deny; unknown slugs are ignored
    pub async fn revoke_from_user(&self, user: &UserId, slug: &str) -> Result<bool> {
        let Some(permission) = self.find_by_slug(slug).await? else {
            return Ok(false);
        };

        let removed = self.store.remove_user_permission(user, permission.id).await?;
        if removed {
            self.cache.invalidate();
            info!(user = %user, permission = %slug, "Direct permission revoked");
        }
        Ok(removed)
    }

    /// Replace every direct permission of a user.
    ///
    /// A slug present in both lists ends up denied.
    pub async fn sync_for_user<G, D>(&self, user: &UserId, grants: &[G], denies: &[D]) -> Result<()>
    where
        G: AsRef<str>,
        D: AsRef<str>,
    {
        let grant_ids = self.resolve_ids(grants).await?;
        let deny_ids = self.resolve_ids(denies).await?;

        self.store
            .replace_user_permissions(user, &grant_ids, &deny_ids)
            .await?;
        self.cache.invalidate();

        info!(
            user = %user,
            grants = grant_ids.len(),
            denies = deny_ids.len(),
            "Direct permissions synced"
        );
        Ok(())
    }

    async fn set_for_user(&self, user: &UserId, slug: &str, kind: PermissionType) -> Result<()> {
        let permission = self.find_or_fail(slug).await?;

        self.store.set_user_permission(user, permission.id, kind).await?;
        self.cache.invalidate();

        info!(user = %user, permission = %slug, kind = %kind, "Direct permission set");
        Ok(())
    }

    async fn resolve_ids<S: AsRef<str>>(&self, slugs: &[S]) -> Result<Vec<PermissionId>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            ids.push(self.find_or_fail(slug.as_ref()).await?.id);
        }
        Ok(ids)
    }

    async fn find_or_insert(&self, mut permission: NewPermission) -> Result<Permission> {
        validate_slug(&permission.slug)?;
        if let Some(existing) = self.find_by_slug(&permission.slug).await? {
            return Ok(existing);
        }
        if permission.name.trim().is_empty() {
            permission.name = name_from_slug(&permission.slug);
        }

        let slug = permission.slug.clone();
        match self.store.insert_permission(permission).await {
            Ok(created) => {
                self.cache.invalidate();
                info!(permission = %created.slug, "Permission created");
                Ok(created)
            }
            // Lost a race with a concurrent insert of the same slug
            Err(err) if err.is_conflict() => {
                debug!(permission = %slug, "Permission created concurrently");
                self.find_or_fail(&slug).await
            }
            Err(err) => Err(err.into()),
        }
    }
}

pub(crate) fn validate_slug(slug: &str) -> Result<()> {
    if slug.trim().is_empty() {
        return Err(AuthzError::InvalidArgument(
            "Permission slug is required.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::store::InMemoryStore;

    fn index() -> PermissionIndex {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(PermissionCache::new(CacheConfig::default()));
        PermissionIndex::new(store, cache)
    }

    #[test]
    fn test_name_from_slug() {
        assert_eq!(name_from_slug("users.delete"), "Users Delete");
        assert_eq!(name_from_slug("manage_billing-settings"), "Manage Billing Settings");
        assert_eq!(name_from_slug("export"), "Export");
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let index = index();

        let first = index.find_or_create("users.delete", None, None).await.unwrap();
        assert_eq!(first.name, "Users Delete");

        let second = index
            .find_or_create("users.delete", Some("Other"), Some("ignored"))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Users Delete");
        assert_eq!(index.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_empty_slug() {
        let index = index();
        index
            .create(NewPermission::new("posts.view", "View posts"))
            .await
            .unwrap();

        let err = index
            .create(NewPermission::new("posts.view", "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyExists(_)));

        let err = index.create(NewPermission::new(" ", "Blank")).await.unwrap_err();
        assert!(matches!(err, AuthzError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_find_or_fail_message() {
        let err = index().find_or_fail("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: Permission 'ghost' not found.");
    }

    #[tokio::test]
    async fn test_create_many_and_grouped() {
        let index = index();
        let created = index
            .create_many(vec![
                NewPermission::new("users.view", "").with_group("users"),
                NewPermission::new("users.delete", "").with_group("users"),
                NewPermission::new("reports.export", "Export reports"),
                NewPermission::new("users.view", "Duplicate"),
            ])
            .await
            .unwrap();

        assert_eq!(created.len(), 4);
        assert_eq!(created[0].id, created[3].id);
        assert_eq!(index.all().await.unwrap().len(), 3);

        let grouped = index.grouped().await.unwrap();
        let groups: Vec<&String> = grouped.keys().collect();
        assert_eq!(groups, vec!["general", "users"]);
        assert_eq!(grouped["users"].len(), 2);
        assert_eq!(grouped[DEFAULT_GROUP][0].slug, "reports.export");
    }

    #[tokio::test]
    async fn test_user_grant_and_deny_replace_each_other() {
        let index = index();
        index.find_or_create("reports.export", None, None).await.unwrap();
        let alice = UserId::new("alice");

        index.grant_to_user(&alice, "reports.export").await.unwrap();
        index.deny_to_user(&alice, "reports.export").await.unwrap();

        let direct = index.for_user(&alice).await.unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].kind, PermissionType::Deny);

        assert!(index.revoke_from_user(&alice, "reports.export").await.unwrap());
        assert!(!index.revoke_from_user(&alice, "unknown").await.unwrap());
        assert!(index.for_user(&alice).await.unwrap().is_empty());

        let err = index.grant_to_user(&alice, "unknown").await.unwrap_err();
        assert!(matches!(err, AuthzError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sync_for_user_deny_wins() {
        let index = index();
        for slug in ["a", "b", "c"] {
            index.find_or_create(slug, None, None).await.unwrap();
        }
        let alice = UserId::new("alice");
        index.grant_to_user(&alice, "c").await.unwrap();

        index.sync_for_user(&alice, &["a", "b"], &["b"]).await.unwrap();

        let mut direct: Vec<(String, PermissionType)> = index
            .for_user(&alice)
            .await
            .unwrap()
            .into_iter()
            .map(|d| (d.permission.slug, d.kind))
            .collect();
        direct.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            direct,
            vec![
                ("a".to_string(), PermissionType::Grant),
                ("b".to_string(), PermissionType::Deny),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_cascades_to_users() {
        let index = index();
        index.find_or_create("a", None, None).await.unwrap();
        let alice = UserId::new("alice");
        index.grant_to_user(&alice, "a").await.unwrap();

        index.delete("a").await.unwrap();
        assert!(index.for_user(&alice).await.unwrap().is_empty());

        let err = index.delete("a").await.unwrap_err();
        assert!(matches!(err, AuthzError::NotFound(_)));
    }
}
