//! Authorization code storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::oauth::flow::AuthorizationCode;

/// Storage operations for single-use authorization codes.
#[async_trait]
pub trait CodeStorage: Send + Sync {
    /// Persist a freshly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Atomically consume a code.
    ///
    /// Removes the record and returns it in a single step. When two
    /// redemptions race, exactly one call observes `Some`; the loser
    /// sees `None` and must fail with `invalid_grant`. Implementations
    /// must not split this into a lookup followed by a delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Remove expired codes. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
