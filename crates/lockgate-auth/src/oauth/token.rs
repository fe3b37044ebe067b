//! Token endpoint request and response types.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// A token endpoint request (`application/x-www-form-urlencoded` body).
///
/// Every field is optional at the parsing stage; the grant evaluator
/// enforces presence per grant so that errors carry the precise missing
/// parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Authorization code (authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI, must repeat the authorization request value.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Client identifier (client_secret_post or public clients).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// PKCE code verifier.
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Requested scopes, space-delimited (client_credentials, password,
    /// refresh_token).
    #[serde(default)]
    pub scope: Option<String>,

    /// Resource owner username (password grant).
    #[serde(default)]
    pub username: Option<String>,

    /// Resource owner password (password grant).
    #[serde(default)]
    pub password: Option<String>,

    /// Refresh token value (refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    /// Requested scopes split on whitespace. `None` when the request
    /// carried no scope parameter, which is distinct from an empty one.
    #[must_use]
    pub fn scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }
}

/// A successful token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (a signed JWT).
    pub access_token: String,

    /// Always `bearer`, lowercase.
    pub token_type: String,

    /// Seconds until the access token expires.
    pub expires_in: u64,

    /// Granted scopes, sorted and space-joined. Omitted entirely when
    /// no scopes were granted; never serialized as an empty string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token, present only when the grant produces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OIDC ID token, present when `openid` was granted to a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// A token endpoint error body (RFC 6749 Section 5.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenErrorResponse {
    /// Builds the wire error body for an engine error.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        Self {
            error: error.oauth_error_code().to_string(),
            error_description: Some(error.error_description()),
        }
    }
}
