//! Role hierarchy and role management
//!
//! Roles are stored as a flat table with parent references. [`RoleGraph`]
//! walks that table (ancestors, descendants, effective permissions) and
//! edits role-permission associations; [`RoleManager`] owns role CRUD and
//! user-role assignment.
//!
//! # Example
//!
//! ```rust
//! use permit_authz::engine::PermitEngine;
//! use permit_authz::store::InMemoryStore;
//! use permit_core::{NewRole, UserId};
//! use std::sync::Arc;
//!
//! # async fn example() -> permit_authz::Result<()> {
//! let engine = PermitEngine::new(Arc::new(InMemoryStore::new()));
//!
//! let user = engine.roles().create(NewRole::new("user", "User")).await?;
//! let moderator = engine
//!     .roles()
//!     .create(NewRole::new("moderator", "Moderator").with_parent(user.id))
//!     .await?;
//!
//! let ancestors = engine.graph().ancestors(&moderator).await?;
//! assert_eq!(ancestors[0].slug, "user");
//!
//! engine.roles().assign_to_user(&UserId::new("alice"), "moderator").await?;
//! # Ok(())
//! # }
//! ```

pub mod graph;
pub mod manager;


pub use graph::RoleGraph;
pub use manager::RoleManager;

/// Display name derived from a slug: first letter upper-cased
pub fn default_role_name(slug: &str) -> String {
    let mut chars = slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
