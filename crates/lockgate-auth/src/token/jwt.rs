//! JWT encoding for access and ID tokens.
//!
//! Signing material is opaque to the engine: a [`KeyProvider`] hands
//! out the encoding key and algorithm, and how keys are generated,
//! stored or rotated is the provider's business.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;

/// Source of JWT signing material.
pub trait KeyProvider: Send + Sync {
    /// The key used to sign issued tokens.
    fn encoding_key(&self) -> &EncodingKey;

    /// The signing algorithm matching the key.
    fn algorithm(&self) -> Algorithm;

    /// Key identifier placed in the JWT header, if the provider has one.
    fn key_id(&self) -> Option<&str> {
        None
    }
}

/// Claims of an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user id), absent for client-only grants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience: the client the token was issued to.
    pub aud: String,

    /// Requesting client.
    pub client_id: String,

    /// Granted scopes, space-joined. Omitted when none were granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Token identifier.
    pub jti: String,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Claims of an issued OIDC ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user id).
    pub sub: String,

    /// Audience: the client.
    pub aud: String,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    /// Nonce from the authorization request, when one was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Client-configured custom claims, flattened into the payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Signs access and ID tokens with the configured key provider.
pub struct JwtService {
    key_provider: std::sync::Arc<dyn KeyProvider>,
    issuer: String,
}

impl JwtService {
    /// Creates a JWT service for the given issuer.
    pub fn new(key_provider: std::sync::Arc<dyn KeyProvider>, issuer: impl Into<String>) -> Self {
        Self {
            key_provider,
            issuer: issuer.into(),
        }
    }

    /// The `iss` value stamped into every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs a claim set.
    ///
    /// # Errors
    ///
    /// Returns an internal error if encoding fails; the message never
    /// reaches the wire.
    pub fn sign<T: Serialize>(&self, claims: &T) -> AuthResult<String> {
        let mut header = Header::new(self.key_provider.algorithm());
        header.kid = self.key_provider.key_id().map(str::to_string);
        encode(&header, claims, self.key_provider.encoding_key())
            .map_err(|e| AuthError::internal(format!("JWT encoding failed: {e}")))
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
