//! Security domain storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Domain;

/// Storage operations for security domains.
#[async_trait]
pub trait DomainStorage: Send + Sync {
    /// Find a domain by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, domain_id: &str) -> AuthResult<Option<Domain>>;
}
