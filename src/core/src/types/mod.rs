//! Shared types for the Permit engine

pub mod ids;
pub mod entity;
pub mod subject;

// Re-export commonly used types
pub use ids::{PermissionId, RoleId, UserId};
pub use entity::{DirectPermission, NewPermission, NewRole, Permission, PermissionType, Role};
pub use subject::{Resource, User};
