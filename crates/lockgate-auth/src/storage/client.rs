//! Client storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 client registrations.
///
/// The flow engine only reads client configuration; registration and
/// mutation happen through the management plane, which is expected to
/// run [`Client::validate`](crate::types::Client::validate) before
/// persisting.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns `None` if the client doesn't exist. Inactive clients are
    /// returned so callers can distinguish the cases in their logs while
    /// still answering the wire uniformly.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Verify a client secret.
    ///
    /// A secret matches when it equals any currently valid secret of the
    /// client, so rotation windows where the old and new secret coexist
    /// both authenticate.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool>;
}
