//! Authorization flow context and authorization codes.
//!
//! A flow is created when an authorization request passes validation and
//! survives across the login and consent transitions. It carries every
//! parameter the final issuance step needs, so later transitions never
//! re-read the original query string.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::authorize::{ResponseMode, ResponseType};
use crate::oauth::pkce::PkceChallenge;

/// Stage of an in-flight authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    /// Waiting for the end user to authenticate.
    AwaitingLogin,
    /// Waiting for the end user to approve the requested scopes.
    AwaitingConsent,
    /// A response has been delivered to the client.
    Issued,
}

/// An in-flight authorization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationFlow {
    /// Flow identifier, carried through login and consent round trips.
    pub id: Uuid,

    /// Owning domain.
    pub domain_id: String,

    /// Requesting client.
    pub client_id: String,

    /// Validated redirect URI.
    pub redirect_uri: String,

    /// Requested scopes (validated against the client at a later stage).
    pub requested_scopes: Vec<String>,

    /// Client state parameter, echoed verbatim on every response.
    pub state: Option<String>,

    /// Response type of the request.
    pub response_type: ResponseType,

    /// Where response parameters are delivered.
    pub response_mode: ResponseMode,

    /// PKCE challenge, when the request carried one.
    pub pkce: Option<PkceChallenge>,

    /// OIDC nonce, bound into the ID token at issuance.
    pub nonce: Option<String>,

    /// Authenticated subject, set once login completes.
    pub subject: Option<String>,

    /// Current stage.
    pub stage: FlowStage,

    /// When the flow was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the flow expires. Expired flows reject every transition.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationFlow {
    /// Returns `true` if the flow has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// An issued authorization code pending redemption.
///
/// Codes are single use: the storage backend removes the record
/// atomically on redemption, so concurrent exchanges of the same code
/// resolve to exactly one winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value handed to the client.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI the code was issued against; the token request must
    /// repeat it byte for byte.
    pub redirect_uri: String,

    /// Scopes granted at consent.
    pub scopes: Vec<String>,

    /// Authenticated subject.
    pub subject: String,

    /// PKCE challenge to verify at redemption, if any.
    pub pkce: Option<PkceChallenge>,

    /// OIDC nonce carried into the ID token.
    pub nonce: Option<String>,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// Generates a cryptographically random authorization code.
///
/// 256 bits of entropy, base64url encoded without padding (43 chars).
#[must_use]
pub fn generate_code() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates an opaque session or refresh token value.
///
/// Same construction as [`generate_code`]; kept separate so call sites
/// document what they are minting.
#[must_use]
pub fn generate_opaque_token() -> String {
    generate_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_generate_code_format() {
        let code = generate_code();
        assert_eq!(code.len(), 43);
        assert!(!code.contains('='));
        assert!(!code.contains('+'));
        assert!(!code.contains('/'));
    }

    #[test]
    fn test_generate_code_unique() {
        assert_ne!(generate_code(), generate_code());
    }

    #[test]
    fn test_code_expiry() {
        let code = AuthorizationCode {
            code: generate_code(),
            client_id: "client-1".to_string(),
            redirect_uri: "http://localhost:4000/".to_string(),
            scopes: vec!["openid".to_string()],
            subject: "user-1".to_string(),
            pkce: None,
            nonce: None,
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
        };
        assert!(code.is_expired());
    }

    #[test]
    fn test_flow_expiry() {
        let flow = AuthorizationFlow {
            id: Uuid::new_v4(),
            domain_id: "domain-1".to_string(),
            client_id: "client-1".to_string(),
            redirect_uri: "http://localhost:4000/".to_string(),
            requested_scopes: vec![],
            state: None,
            response_type: ResponseType::Code,
            response_mode: ResponseMode::Query,
            pkce: None,
            nonce: None,
            subject: None,
            stage: FlowStage::AwaitingLogin,
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(5),
        };
        assert!(!flow.is_expired());
    }
}
