//! Refresh token storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage operations for refresh tokens.
///
/// Tokens are keyed by the SHA-256 hash of their value; the raw value
/// is never persisted.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Persist a newly issued token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Find a token by the hash of its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Mark a token revoked. Idempotent for already revoked tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<()>;

    /// Remove expired and revoked tokens. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
