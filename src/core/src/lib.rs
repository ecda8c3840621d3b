//! # Permit Core
//!
//! Shared types, collaborator traits, and error handling for the Permit
//! authorization engine. Storage backends and session integrations depend on
//! this crate only, never on the engine itself.

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{StoreError, Result};
pub use traits::{SessionProvider, StaticSession, Store};
pub use types::{
    DirectPermission, NewPermission, NewRole, Permission, PermissionId, PermissionType, Resource,
    Role, RoleId, User, UserId,
};
