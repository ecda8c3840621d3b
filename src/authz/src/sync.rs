//! Declarative role and permission reconciliation
//!
//! A sync run walks an ordered list of role definitions. Missing roles are
//! created; roles that already exist keep their name, description and
//! parent. A declared permission list always replaces the role's direct
//! permissions, creating unknown permissions on the way.
//!
//! ```text
//! {"admin":  {"permissions": ["users.view", "users.delete"]},
//!  "editor": {"inherits": "viewer", "permissions": ["posts.update"]}}
//! ```

use crate::engine::cache::PermissionCache;
use crate::error::{AuthzError, Result};
use crate::permissions::PermissionIndex;
use crate::roles::{default_role_name, RoleGraph, RoleManager};
use permit_core::{NewRole, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Desired state of one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDefinition {
    /// Name used when the role is created; defaults to the capitalised slug
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description used when the role is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent role slug, applied only when the role is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,

    /// Exact set of direct permissions; `None` leaves permissions untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl RoleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(parent.into());
        self
    }

    pub fn permissions<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(slugs.into_iter().map(Into::into).collect());
        self
    }
}

/// Ordered role-slug to definition mapping.
///
/// Entries parsed from JSON whose value does not decode are kept in place,
/// carrying the decode error, and reported as failures by a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDefinitions {
    entries: Vec<(String, std::result::Result<RoleDefinition, String>)>,
}

impl RoleDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition (builder style)
    pub fn role(mut self, slug: impl Into<String>, definition: RoleDefinition) -> Self {
        self.push(slug, definition);
        self
    }

    /// Append a definition
    pub fn push(&mut self, slug: impl Into<String>, definition: RoleDefinition) {
        self.entries.push((slug.into(), Ok(definition)));
    }

    /// Well-formed definitions, in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleDefinition)> {
        self.entries
            .iter()
            .filter_map(|(slug, def)| def.as_ref().ok().map(|def| (slug.as_str(), def)))
    }

    /// Entries whose JSON value could not be decoded, with the error
    pub fn malformed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(slug, def)| def.as_ref().err().map(|err| (slug.as_str(), err.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object keyed by role slug, keeping key order.
    ///
    /// Only a document that is not a JSON object is an error. Each value is
    /// decoded on its own; one that does not fit [`RoleDefinition`] is kept
    /// as a malformed entry.
    pub fn from_json(json: &str) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut definitions = Self::new();
        for (slug, value) in object {
            let definition = if value.is_null() {
                Ok(RoleDefinition::default())
            } else {
                serde_json::from_value(value)
                    .map_err(|err| AuthzError::Serialization(err).to_string())
            };
            definitions.entries.push((slug, definition));
        }
        Ok(definitions)
    }
}

impl<S: Into<String>> FromIterator<(S, RoleDefinition)> for RoleDefinitions {
    fn from_iter<I: IntoIterator<Item = (S, RoleDefinition)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(slug, def)| (slug.into(), Ok(def)))
                .collect(),
        }
    }
}

/// Entry that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub slug: String,
    pub error: String,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Roles created by this run
    pub created: Vec<String>,

    /// Pre-existing roles the run visited
    pub updated: Vec<String>,

    /// Entries that failed; later entries were still applied
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    /// Whether every entry was applied
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum EntryOutcome {
    Created,
    Updated,
}

/// Applies [`RoleDefinitions`] to the store
pub struct SyncEngine {
    roles: RoleManager,
    graph: RoleGraph,
    permissions: PermissionIndex,
    cache: Arc<PermissionCache>,
}

impl SyncEngine {
    pub fn new(
        roles: RoleManager,
        graph: RoleGraph,
        permissions: PermissionIndex,
        cache: Arc<PermissionCache>,
    ) -> Self {
        Self {
            roles,
            graph,
            permissions,
            cache,
        }
    }

    /// Apply every definition in order.
    ///
    /// A failing entry is recorded in the report and does not stop the run.
    pub async fn run(&self, definitions: &RoleDefinitions) -> SyncReport {
        let mut report = SyncReport::default();

        for (slug, entry) in &definitions.entries {
            let applied = match entry {
                Ok(definition) => self.apply(slug, definition).await,
                Err(decode) => Err(AuthzError::InvalidArgument(format!(
                    "Role '{}' has a malformed definition: {}",
                    slug, decode
                ))),
            };
            match applied {
                Ok(EntryOutcome::Created) => report.created.push(slug.to_string()),
                Ok(EntryOutcome::Updated) => report.updated.push(slug.to_string()),
                Err(err) => {
                    warn!(role = %slug, error = %err, "Sync entry failed");
                    report.failed.push(SyncFailure {
                        slug: slug.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        self.cache.invalidate();

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Sync completed"
        );
        report
    }

    async fn apply(&self, slug: &str, definition: &RoleDefinition) -> Result<EntryOutcome> {
        validate(slug, definition)?;

        let (role, outcome) = match self.roles.find(slug).await? {
            Some(existing) => (existing, EntryOutcome::Updated),
            None => (self.create_role(slug, definition).await?, EntryOutcome::Created),
        };

        if let Some(slugs) = &definition.permissions {
            for permission in slugs {
                self.permissions.find_or_create(permission, None, None).await?;
            }
            self.graph.sync_permissions(&role, slugs.as_slice()).await?;
        }

        Ok(outcome)
    }

    async fn create_role(&self, slug: &str, definition: &RoleDefinition) -> Result<Role> {
        let name = definition
            .name
            .clone()
            .unwrap_or_else(|| default_role_name(slug));
        let mut new_role = NewRole::new(slug, name);
        new_role.description = definition.description.clone();

        if let Some(parent) = &definition.inherits {
            match self.roles.find(parent).await? {
                Some(parent) => new_role.parent_id = Some(parent.id),
                None => warn!(
                    role = %slug,
                    parent = %parent,
                    "Parent role not found, creating without parent"
                ),
            }
        }

        self.roles.create(new_role).await
    }
}

fn validate(slug: &str, definition: &RoleDefinition) -> Result<()> {
    if slug.trim().is_empty() {
        return Err(AuthzError::InvalidArgument(
            "Role slug is required.".to_string(),
        ));
    }
    let blank = definition
        .permissions
        .iter()
        .flatten()
        .any(|p| p.trim().is_empty());
    if blank {
        return Err(AuthzError::InvalidArgument(format!(
            "Role '{}' lists an empty permission slug.",
            slug
        )));
    }
    Ok(())
}
