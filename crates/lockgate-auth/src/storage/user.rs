//! End-user identity storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::User;

/// Identity provider operations for end users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Authenticate a user by credentials.
    ///
    /// Returns `None` for unknown usernames, wrong passwords and
    /// disabled accounts alike; the engine answers all three with the
    /// same message so accounts cannot be enumerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn authenticate(
        &self,
        domain_id: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<User>>;

    /// Find a user by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>>;
}
