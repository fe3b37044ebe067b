//! OAuth 2.0 Client domain types.
//!
//! This module defines the `Client` struct and related types for OAuth 2.0
//! client registrations. The engine reads this configuration read-only at
//! flow-evaluation time; mutation happens through the management plane.

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows a client is allowed to use. The wire
/// `grant_type` string is parsed into this closed enum so that dispatch
/// is exhaustiveness-checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (optionally PKCE-protected).
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
    /// Resource Owner Password Credentials flow.
    Password,
    /// Implicit flow (`response_type=token`).
    Implicit,
}

impl GrantType {
    /// Parses the OAuth 2.0 `grant_type` parameter value.
    ///
    /// Returns `None` for unknown values; callers surface those as
    /// `unsupported_grant_type`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            "password" => Some(Self::Password),
            "implicit" => Some(Self::Implicit),
            _ => None,
        }
    }

    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::Password => "password",
            Self::Implicit => "implicit",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Application Type
// =============================================================================

/// Application type of a registered client.
///
/// Each type carries a fixed permitted grant set; a client's grant
/// allow-list must be a subset of its application type's permitted set.
/// This is the registration-time narrowing the flow engine later enforces
/// by reading the client's `grant_types` — it is never re-derived per grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationType {
    /// Server-side web application.
    Web,
    /// Native (mobile/desktop) application.
    Native,
    /// Browser-based (single-page) application.
    Browser,
    /// Machine-to-machine service.
    Service,
    /// Autonomous agent: `client_credentials` and `authorization_code` only.
    Agent,
}

impl ApplicationType {
    /// Returns the grant types this application type may enable.
    #[must_use]
    pub fn permitted_grant_types(&self) -> &'static [GrantType] {
        match self {
            Self::Web => &[
                GrantType::AuthorizationCode,
                GrantType::ClientCredentials,
                GrantType::RefreshToken,
                GrantType::Password,
                GrantType::Implicit,
            ],
            Self::Native => &[
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::Implicit,
            ],
            Self::Browser => &[GrantType::AuthorizationCode, GrantType::Implicit],
            Self::Service => &[GrantType::ClientCredentials],
            Self::Agent => &[GrantType::ClientCredentials, GrantType::AuthorizationCode],
        }
    }

    /// Returns the string representation of the application type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "WEB",
            Self::Native => "NATIVE",
            Self::Browser => "BROWSER",
            Self::Service => "SERVICE",
            Self::Agent => "AGENT",
        }
    }
}

// =============================================================================
// Token Endpoint Auth Method
// =============================================================================

/// Token endpoint authentication methods.
///
/// Defined in OpenID Connect Core Section 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,
    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,
    /// Client secret in request body.
    ClientSecretPost,
    /// Client assertion JWT signed with a private key.
    PrivateKeyJwt,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::PrivateKeyJwt => "private_key_jwt",
        }
    }
}

impl std::fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Secret
// =============================================================================

/// A client secret with an independent lifecycle.
///
/// A client may hold several secrets at once; during rotation both the
/// old and the new secret authenticate until the old one is revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecret {
    /// Secret identifier (used by the management plane for revocation).
    pub id: String,

    /// The secret value as stored by the backend.
    pub secret: String,

    /// When the secret was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the secret expires, if ever.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl ClientSecret {
    /// Returns `true` if the secret is currently usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.expires_at
            .is_none_or(|exp| OffsetDateTime::now_utc() < exp)
    }
}

// =============================================================================
// Scope Setting
// =============================================================================

/// Per-scope configuration on a client.
///
/// A scope must be registered here to be requestable. `expires_in`
/// bounds how long a user's consent for the scope remains valid; once
/// past it the approval is treated as absent and consent re-runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSetting {
    /// Scope key, e.g. `openid` or `scope1`.
    pub scope: String,

    /// Whether the scope is granted by default when none are requested.
    #[serde(default)]
    pub default_scope: bool,

    /// Approval lifetime in seconds. `None` means approvals never expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 Client registration.
///
/// Represents a client application with credentials and flow configuration.
/// Owned by a [`Domain`](crate::types::Domain); the flow engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Human-readable display name.
    pub name: String,

    /// Identifier of the owning domain.
    pub domain_id: String,

    /// Application type; bounds the permitted grant set.
    pub application_type: ApplicationType,

    /// Client secrets, each with its own lifecycle (rotation support).
    #[serde(default)]
    pub secrets: Vec<ClientSecret>,

    /// OAuth 2.0 grant types this client is allowed to use.
    /// Invariant: subset of `application_type.permitted_grant_types()`.
    pub grant_types: Vec<GrantType>,

    /// Allowed redirect URIs for the authorization code and implicit flows.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Token endpoint authentication methods the client may use.
    #[serde(default)]
    pub token_endpoint_auth_methods: Vec<TokenEndpointAuthMethod>,

    /// Scopes registered on this client.
    #[serde(default)]
    pub scope_settings: Vec<ScopeSetting>,

    /// Whether PKCE is required on the authorization endpoint.
    #[serde(default)]
    pub force_pkce: bool,

    /// Whether the `plain` code challenge method is rejected.
    #[serde(default)]
    pub force_s256_code_challenge_method: bool,

    /// Whether this is a confidential client (holds secrets).
    pub confidential: bool,

    /// Whether this client is currently active and can be used.
    pub active: bool,

    /// Access token lifetime in seconds (domain default when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds (domain default when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    /// Custom claims injected into issued ID tokens.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub id_token_custom_claims: serde_json::Map<String, serde_json::Value>,

    /// Inline JWKS for `private_key_jwt` authentication.
    /// Mutually exclusive with `jwks_uri`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<JwkSet>,

    /// JWKS URI for fetching the client's public keys dynamically.
    /// Mutually exclusive with `jwks`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

impl Client {
    /// Validates the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is invalid.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        let permitted = self.application_type.permitted_grant_types();
        if let Some(grant) = self.grant_types.iter().find(|g| !permitted.contains(g)) {
            return Err(ClientValidationError::GrantNotPermitted {
                grant_type: *grant,
                application_type: self.application_type,
            });
        }

        if self.confidential && self.secrets.is_empty() {
            return Err(ClientValidationError::MissingSecret);
        }

        if !self.confidential && self.grant_types.contains(&GrantType::ClientCredentials) {
            return Err(ClientValidationError::PublicClientCredentials);
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        // Either a JWKS document or a URI, never both; no fallback precedence.
        if self.jwks.is_some() && self.jwks_uri.is_some() {
            return Err(ClientValidationError::AmbiguousJwks);
        }

        Ok(())
    }

    /// Checks if the given redirect URI is allowed for this client.
    ///
    /// `strict_matching` comes from the owning domain: strict mode is
    /// byte equality (extra query parameters are a mismatch), loose mode
    /// is a prefix match on the registered URI.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str, strict_matching: bool) -> bool {
        self.redirect_uris.iter().any(|allowed| {
            if strict_matching {
                allowed == uri
            } else {
                uri.starts_with(allowed.as_str())
            }
        })
    }

    /// Checks if the given scope is registered on this client.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scope_settings.iter().any(|s| s.scope == scope)
    }

    /// Returns the configuration of a registered scope, if any.
    #[must_use]
    pub fn scope_setting(&self, scope: &str) -> Option<&ScopeSetting> {
        self.scope_settings.iter().find(|s| s.scope == scope)
    }

    /// Returns the scopes granted when a request carries none.
    #[must_use]
    pub fn default_scopes(&self) -> Vec<String> {
        self.scope_settings
            .iter()
            .filter(|s| s.default_scope)
            .map(|s| s.scope.clone())
            .collect()
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Checks if the given token endpoint auth method is allowed.
    ///
    /// An empty list defaults to `client_secret_basic` for confidential
    /// clients and `none` for public ones.
    #[must_use]
    pub fn is_auth_method_allowed(&self, method: TokenEndpointAuthMethod) -> bool {
        if self.token_endpoint_auth_methods.is_empty() {
            return if self.confidential {
                matches!(
                    method,
                    TokenEndpointAuthMethod::ClientSecretBasic
                        | TokenEndpointAuthMethod::ClientSecretPost
                )
            } else {
                matches!(method, TokenEndpointAuthMethod::None)
            };
        }
        self.token_endpoint_auth_methods.contains(&method)
    }

    /// Returns the secrets that are currently valid (not expired).
    #[must_use]
    pub fn valid_secrets(&self) -> impl Iterator<Item = &ClientSecret> {
        self.secrets.iter().filter(|s| s.is_valid())
    }

    /// Returns whether PKCE is required for this client.
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        self.force_pkce || !self.confidential
    }

    /// Returns the access token lifetime in seconds, falling back to the
    /// supplied domain default.
    #[must_use]
    pub fn access_token_lifetime_secs(&self, domain_default: i64) -> i64 {
        self.access_token_lifetime.unwrap_or(domain_default)
    }

    /// Returns the refresh token lifetime in seconds, falling back to the
    /// supplied domain default.
    #[must_use]
    pub fn refresh_token_lifetime_secs(&self, domain_default: i64) -> i64 {
        self.refresh_token_lifetime.unwrap_or(domain_default)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Client name cannot be empty.
    #[error("Client name cannot be empty")]
    EmptyName,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// A grant type is outside the application type's permitted set.
    #[error("Grant type {grant_type} is not permitted for {application_type:?} applications")]
    GrantNotPermitted {
        /// The offending grant type.
        grant_type: GrantType,
        /// The application type whose permitted set was exceeded.
        application_type: ApplicationType,
    },

    /// Public clients cannot use client_credentials grant.
    #[error("Public clients cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Confidential clients require at least one client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,

    /// Inline JWKS and JWKS URI are mutually exclusive.
    #[error("jwks and jwks_uri are mutually exclusive")]
    AmbiguousJwks,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn secret(id: &str, value: &str, expires_at: Option<OffsetDateTime>) -> ClientSecret {
        ClientSecret {
            id: id.to_string(),
            secret: value.to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        }
    }

    fn make_web_client() -> Client {
        Client {
            client_id: "web-client".to_string(),
            name: "Web Client".to_string(),
            domain_id: "domain-1".to_string(),
            application_type: ApplicationType::Web,
            secrets: vec![secret("s1", "secret-1", None)],
            grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::Password,
            ],
            redirect_uris: vec!["http://localhost:4000/".to_string()],
            token_endpoint_auth_methods: vec![],
            scope_settings: vec![
                ScopeSetting {
                    scope: "openid".to_string(),
                    default_scope: true,
                    expires_in: None,
                },
                ScopeSetting {
                    scope: "scope1".to_string(),
                    default_scope: false,
                    expires_in: Some(2),
                },
            ],
            force_pkce: false,
            force_s256_code_challenge_method: false,
            confidential: true,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            id_token_custom_claims: serde_json::Map::new(),
            jwks: None,
            jwks_uri: None,
        }
    }

    fn make_agent_client() -> Client {
        Client {
            client_id: "agent-client".to_string(),
            name: "Agent".to_string(),
            domain_id: "domain-1".to_string(),
            application_type: ApplicationType::Agent,
            secrets: vec![secret("s1", "agent-secret", None)],
            grant_types: vec![GrantType::ClientCredentials, GrantType::AuthorizationCode],
            redirect_uris: vec!["http://localhost:4000/".to_string()],
            token_endpoint_auth_methods: vec![],
            scope_settings: vec![ScopeSetting {
                scope: "scope1".to_string(),
                default_scope: false,
                expires_in: None,
            }],
            force_pkce: false,
            force_s256_code_challenge_method: false,
            confidential: true,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            id_token_custom_claims: serde_json::Map::new(),
            jwks: None,
            jwks_uri: None,
        }
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(
            GrantType::parse("client_credentials"),
            Some(GrantType::ClientCredentials)
        );
        assert_eq!(GrantType::parse("extension_grant"), None);
    }

    #[test]
    fn test_valid_clients() {
        assert!(make_web_client().validate().is_ok());
        assert!(make_agent_client().validate().is_ok());
    }

    #[test]
    fn test_agent_cannot_enable_password_grant() {
        let mut client = make_agent_client();
        client.grant_types.push(GrantType::Password);
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::GrantNotPermitted {
                grant_type: GrantType::Password,
                ..
            })
        ));
    }

    #[test]
    fn test_agent_cannot_enable_refresh_or_implicit() {
        for grant in [GrantType::RefreshToken, GrantType::Implicit] {
            let mut client = make_agent_client();
            client.grant_types = vec![grant];
            assert!(matches!(
                client.validate(),
                Err(ClientValidationError::GrantNotPermitted { .. })
            ));
        }
    }

    #[test]
    fn test_service_only_client_credentials() {
        let mut client = make_agent_client();
        client.application_type = ApplicationType::Service;
        client.grant_types = vec![GrantType::ClientCredentials];
        client.redirect_uris = vec![];
        assert!(client.validate().is_ok());

        client.grant_types = vec![GrantType::AuthorizationCode];
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_jwks_and_jwks_uri_mutually_exclusive() {
        let mut client = make_web_client();
        client.jwks = serde_json::from_str(r#"{"keys":[]}"#).ok();
        client.jwks_uri = Some("https://client.example.com/jwks".to_string());
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::AmbiguousJwks)
        ));
    }

    #[test]
    fn test_confidential_without_secret() {
        let mut client = make_web_client();
        client.secrets = vec![];
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::MissingSecret)
        ));
    }

    #[test]
    fn test_redirect_uri_strict_matching() {
        let client = make_web_client();
        assert!(client.is_redirect_uri_allowed("http://localhost:4000/", true));
        assert!(!client.is_redirect_uri_allowed("http://localhost:4000/?param=x", true));
        assert!(!client.is_redirect_uri_allowed("http://localhost:5000/", true));
    }

    #[test]
    fn test_redirect_uri_loose_matching() {
        let client = make_web_client();
        assert!(client.is_redirect_uri_allowed("http://localhost:4000/", false));
        assert!(client.is_redirect_uri_allowed("http://localhost:4000/?param=x", false));
        assert!(client.is_redirect_uri_allowed("http://localhost:4000/callback", false));
        assert!(!client.is_redirect_uri_allowed("http://localhost:5000/", false));
    }

    #[test]
    fn test_scope_registration() {
        let client = make_web_client();
        assert!(client.is_scope_allowed("openid"));
        assert!(client.is_scope_allowed("scope1"));
        assert!(!client.is_scope_allowed("unknown"));
        assert_eq!(client.default_scopes(), vec!["openid".to_string()]);
        assert_eq!(client.scope_setting("scope1").unwrap().expires_in, Some(2));
    }

    #[test]
    fn test_secret_rotation_both_valid() {
        let mut client = make_web_client();
        client.secrets.push(secret("s2", "secret-2", None));

        let valid: Vec<_> = client.valid_secrets().map(|s| s.secret.as_str()).collect();
        assert_eq!(valid, vec!["secret-1", "secret-2"]);
    }

    #[test]
    fn test_expired_secret_not_valid() {
        let mut client = make_web_client();
        client.secrets.push(secret(
            "s2",
            "old-secret",
            Some(OffsetDateTime::now_utc() - Duration::hours(1)),
        ));

        let valid: Vec<_> = client.valid_secrets().map(|s| s.secret.as_str()).collect();
        assert_eq!(valid, vec!["secret-1"]);
    }

    #[test]
    fn test_auth_method_defaults() {
        let client = make_web_client();
        assert!(client.is_auth_method_allowed(TokenEndpointAuthMethod::ClientSecretBasic));
        assert!(client.is_auth_method_allowed(TokenEndpointAuthMethod::ClientSecretPost));
        assert!(!client.is_auth_method_allowed(TokenEndpointAuthMethod::None));

        let mut restricted = make_web_client();
        restricted.token_endpoint_auth_methods = vec![TokenEndpointAuthMethod::ClientSecretPost];
        assert!(!restricted.is_auth_method_allowed(TokenEndpointAuthMethod::ClientSecretBasic));
        assert!(restricted.is_auth_method_allowed(TokenEndpointAuthMethod::ClientSecretPost));
    }

    #[test]
    fn test_requires_pkce() {
        let mut client = make_web_client();
        assert!(!client.requires_pkce());

        client.force_pkce = true;
        assert!(client.requires_pkce());

        client.force_pkce = false;
        client.confidential = false;
        client.secrets = vec![];
        client.grant_types = vec![GrantType::AuthorizationCode];
        assert!(client.requires_pkce());
    }

    #[test]
    fn test_token_lifetimes_fall_back_to_domain() {
        let mut client = make_web_client();
        assert_eq!(client.access_token_lifetime_secs(7200), 7200);

        client.access_token_lifetime = Some(1800);
        assert_eq!(client.access_token_lifetime_secs(7200), 1800);
    }

    #[test]
    fn test_serde_roundtrip() {
        let client = make_agent_client();
        let json = serde_json::to_string(&client).unwrap();
        let parsed: Client = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.client_id, client.client_id);
        assert_eq!(parsed.application_type, ApplicationType::Agent);
        assert_eq!(parsed.grant_types, client.grant_types);
    }
}
