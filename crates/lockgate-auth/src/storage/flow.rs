//! Authorization flow storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::oauth::flow::AuthorizationFlow;

/// Storage operations for in-flight authorization flows.
///
/// Flows live only for the duration of a login/consent round trip;
/// backends may keep them in volatile storage.
#[async_trait]
pub trait FlowStorage: Send + Sync {
    /// Persist a new flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, flow: &AuthorizationFlow) -> AuthResult<()>;

    /// Find a flow by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<AuthorizationFlow>>;

    /// Replace a stored flow after a stage transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn update(&self, flow: &AuthorizationFlow) -> AuthResult<()>;

    /// Delete a flow once it has produced a response.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, id: Uuid) -> AuthResult<()>;
}
