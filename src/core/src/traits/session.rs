//! Current-user resolution

use crate::types::User;
use async_trait::async_trait;

/// Supplies the user bound to the current request or session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The authenticated user, or `None` for anonymous access
    async fn current_user(&self) -> Option<User>;
}

/// Session that always reports the same user (or nobody).
///
/// Useful for background jobs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<User>,
}

impl StaticSession {
    /// Session authenticated as `user`
    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// Session with no current user
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_session() {
        let session = StaticSession::authenticated(User::new("alice"));
        let user = tokio_test::block_on(session.current_user());
        assert_eq!(user.map(|u| u.id.0), Some("alice".to_string()));

        let anonymous = StaticSession::anonymous();
        assert!(tokio_test::block_on(anonymous.current_user()).is_none());
    }
}
