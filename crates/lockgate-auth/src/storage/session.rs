//! End-user session storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::EndUserSession;

/// Storage operations for gateway sessions.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, session: &EndUserSession) -> AuthResult<()>;

    /// Find a session by its opaque token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<EndUserSession>>;

    /// Delete a session (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, token: &str) -> AuthResult<()>;
}
