//! Storage error types
//!
//! Backends translate their native failures into [`StoreError`] so the
//! engine can tell a missing row or a uniqueness violation apart from an
//! infrastructure failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Error returned by a [`Store`](crate::traits::Store) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated (slug or association key)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, serialization, ...)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the error is a uniqueness violation
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Conflict("role slug 'admin'".to_string());
        assert_eq!(err.to_string(), "Conflict: role slug 'admin'");
        assert!(err.is_conflict());
        assert!(!StoreError::NotFound("x".into()).is_conflict());
    }
}
