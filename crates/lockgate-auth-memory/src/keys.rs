//! HMAC signing material for single-node deployments.

use jsonwebtoken::{Algorithm, EncodingKey};
use lockgate_auth::token::jwt::KeyProvider;

/// Key provider backed by an HS256 shared secret.
pub struct HmacKeyProvider {
    key: EncodingKey,
    key_id: Option<String>,
}

impl HmacKeyProvider {
    /// Creates a provider from the shared secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            key_id: None,
        }
    }

    /// Sets the `kid` placed in token headers.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }
}

impl KeyProvider for HmacKeyProvider {
    fn encoding_key(&self) -> &EncodingKey {
        &self.key
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::HS256
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }
}

impl std::fmt::Debug for HmacKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacKeyProvider")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}
