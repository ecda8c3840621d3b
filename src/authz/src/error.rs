//! Error types for the authorization engine

use permit_core::StoreError;
use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// An "or-fail" lookup found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A role or permission with the same slug already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No current user could be resolved
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The current user may not perform the ability
    #[error("You are not authorized to perform this action: {0}")]
    Unauthorized(String),

    /// Missing slug, unresolved reference, or hierarchy cycle
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage backend failure
    #[error("Store error: {0}")]
    Store(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AuthzError::NotFound(what),
            StoreError::Conflict(what) => AuthzError::AlreadyExists(what),
            StoreError::Backend(msg) => AuthzError::Store(msg),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: AuthzError = StoreError::Conflict("role 'admin'".into()).into();
        assert!(matches!(err, AuthzError::AlreadyExists(_)));

        let err: AuthzError = StoreError::NotFound("role".into()).into();
        assert!(matches!(err, AuthzError::NotFound(_)));

        let err: AuthzError = StoreError::Backend("connection reset".into()).into();
        assert_eq!(err.to_string(), "Store error: connection reset");
    }

    #[test]
    fn test_unauthorized_message() {
        let err = AuthzError::Unauthorized("posts.delete".into());
        assert_eq!(
            err.to_string(),
            "You are not authorized to perform this action: posts.delete"
        );
    }
}
