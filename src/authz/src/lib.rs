//! # Permit Authorization Engine
//!
//! Role-based access control with role inheritance, dynamic gates and
//! per-user overrides.
//!
//! ## Features
//!
//! - **Role hierarchy**: roles inherit every permission of their ancestors
//! - **Gates** with before/after hooks for attribute-based rules
//! - **Direct grants and denies** per user, deny always winning
//! - **Super-admin bypass** through a configurable role
//! - **Permission cache** with TTL and generation-based invalidation
//! - **Declarative sync** of roles and permissions from JSON
//!
//! ## Example
//!
//! ```rust
//! use permit_authz::{PermitEngine, InMemoryStore};
//! use permit_core::{Resource, User};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = PermitEngine::new(Arc::new(InMemoryStore::new()));
//!
//!     engine.role().slug("user").permissions(["profile.view"]).create().await?;
//!     engine
//!         .role()
//!         .slug("moderator")
//!         .inherits("user")
//!         .permission("content.moderate")
//!         .create()
//!         .await?;
//!
//!     engine.gates().define("posts.update", |user: &User, post: Option<&Resource>| {
//!         post.map_or(false, |p| p.is_owned_by(user))
//!     });
//!
//!     let alice = User::new("alice");
//!     engine.assign_role(&alice.id, "moderator").await?;
//!
//!     assert!(engine.can(&alice, "profile.view", None).await?);
//!
//!     let post = Resource::new("post:1").with_attribute("owner_id", "alice");
//!     if engine.can(&alice, "posts.update", Some(&post)).await? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod permissions;
pub mod roles;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use builder::{PermissionBuilder, RoleBuilder};
pub use config::{CacheConfig, PermitConfig};
pub use engine::{CacheStats, Decision, DecisionSource, EngineMetrics, PermitEngine};
pub use error::{AuthzError, Result};
pub use gate::{GateOutcome, GateRegistry, ResourceAbility, ResourcePolicy};
pub use permissions::PermissionIndex;
pub use roles::{RoleGraph, RoleManager};
pub use store::InMemoryStore;
pub use sync::{RoleDefinition, RoleDefinitions, SyncFailure, SyncReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
