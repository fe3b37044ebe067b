//! Client authentication for the token endpoint.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients (no authentication)
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! # Authentication Priority
//!
//! When multiple credentials are present, they are tried in order:
//! 1. HTTP Basic Auth header
//! 2. client_secret_post (body parameters)
//! 3. Public client (client_id only)
//!
//! Every credential failure answers with the same `invalid_client`
//! message so the endpoint cannot be used to enumerate registered
//! client identifiers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::token::TokenRequest;
use crate::storage::ClientStorage;
use crate::types::{Client, TokenEndpointAuthMethod};

/// The uniform message for every credential failure.
const AUTH_FAILED: &str = "Client authentication failed";

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Authenticates a client from a token request.
///
/// Tries the authentication methods in priority order and checks the
/// method used against the client's registered allow-list.
///
/// # Errors
///
/// Returns `invalid_client` if no credentials are provided, the client
/// is unknown or inactive, the secret does not match, or the method is
/// not in the client's allow-list. All credential failures share one
/// message.
pub async fn authenticate_client(
    request: &TokenRequest,
    basic_auth: Option<(&str, &str)>,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    // 1. HTTP Basic Auth has highest priority.
    if let Some((client_id, client_secret)) = basic_auth {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretBasic,
            client_storage,
        )
        .await;
    }

    // 2. client_secret_post.
    if let (Some(client_id), Some(client_secret)) = (&request.client_id, &request.client_secret) {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretPost,
            client_storage,
        )
        .await;
    }

    // 3. Public client, client_id only.
    if let Some(client_id) = &request.client_id {
        return authenticate_public(client_id, client_storage).await;
    }

    Err(AuthError::invalid_client(AUTH_FAILED))
}

async fn authenticate_with_secret(
    client_id: &str,
    client_secret: &str,
    method: TokenEndpointAuthMethod,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    let Some(client) = client_storage.find_by_client_id(client_id).await? else {
        tracing::debug!(client_id, "unknown client");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    };

    if !client.active {
        tracing::debug!(client_id, "inactive client");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    if !client.confidential {
        tracing::debug!(client_id, method = %method, "public client sent a secret");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    if !client.is_auth_method_allowed(method) {
        tracing::debug!(client_id, method = %method, "auth method not allowed");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    // Any currently valid secret matches; rotation windows keep both.
    if !client_storage.verify_secret(client_id, client_secret).await? {
        tracing::debug!(client_id, "secret mismatch");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: method,
    })
}

async fn authenticate_public(
    client_id: &str,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    let Some(client) = client_storage.find_by_client_id(client_id).await? else {
        tracing::debug!(client_id, "unknown client");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    };

    if !client.active {
        tracing::debug!(client_id, "inactive client");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    // Confidential clients must present credentials.
    if client.confidential {
        tracing::debug!(client_id, "confidential client sent no credentials");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    if !client.is_auth_method_allowed(TokenEndpointAuthMethod::None) {
        tracing::debug!(client_id, "auth method 'none' not allowed");
        return Err(AuthError::invalid_client(AUTH_FAILED));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: TokenEndpointAuthMethod::None,
    })
}

/// Parses an HTTP Basic Auth header value into client credentials.
///
/// Returns `None` when the header is absent, not Basic, or malformed.
/// Callers that saw a Basic header but got `None` back should fail the
/// request rather than fall through to another method.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use time::OffsetDateTime;

    use crate::types::{ApplicationType, ClientSecret, GrantType};

    struct MockClientStorage {
        clients: Vec<Client>,
    }

    #[async_trait]
    impl ClientStorage for MockClientStorage {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self
                .clients
                .iter()
                .find(|c| c.client_id == client_id)
                .cloned())
        }

        async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
            Ok(self
                .clients
                .iter()
                .find(|c| c.client_id == client_id)
                .is_some_and(|c| c.valid_secrets().any(|s| s.secret == secret)))
        }
    }

    fn confidential_client() -> Client {
        Client {
            client_id: "conf-client".to_string(),
            name: "Confidential".to_string(),
            domain_id: "domain-1".to_string(),
            application_type: ApplicationType::Web,
            secrets: vec![
                ClientSecret {
                    id: "s1".to_string(),
                    secret: "secret-one".to_string(),
                    created_at: OffsetDateTime::now_utc(),
                    expires_at: None,
                },
                ClientSecret {
                    id: "s2".to_string(),
                    secret: "secret-two".to_string(),
                    created_at: OffsetDateTime::now_utc(),
                    expires_at: None,
                },
            ],
            grant_types: vec![GrantType::ClientCredentials],
            redirect_uris: vec![],
            token_endpoint_auth_methods: vec![],
            scope_settings: vec![],
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

    fn public_client() -> Client {
        let mut client = confidential_client();
        client.client_id = "pub-client".to_string();
        client.confidential = false;
        client.secrets = vec![];
        client.grant_types = vec![GrantType::AuthorizationCode];
        client.redirect_uris = vec!["http://localhost:4000/".to_string()];
        client
    }

    fn storage() -> MockClientStorage {
        MockClientStorage {
            clients: vec![confidential_client(), public_client()],
        }
    }

    fn request(client_id: Option<&str>, client_secret: Option<&str>) -> TokenRequest {
        TokenRequest {
            client_id: client_id.map(str::to_string),
            client_secret: client_secret.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_basic_auth_success() {
        let result = authenticate_client(
            &request(None, None),
            Some(("conf-client", "secret-one")),
            &storage(),
        )
        .await
        .unwrap();
        assert_eq!(result.client.client_id, "conf-client");
        assert_eq!(
            result.auth_method,
            TokenEndpointAuthMethod::ClientSecretBasic
        );
    }

    #[tokio::test]
    async fn test_rotated_secret_also_authenticates() {
        let result = authenticate_client(
            &request(None, None),
            Some(("conf-client", "secret-two")),
            &storage(),
        )
        .await
        .unwrap();
        assert_eq!(
            result.auth_method,
            TokenEndpointAuthMethod::ClientSecretBasic
        );
    }

    #[tokio::test]
    async fn test_secret_post_success() {
        let result = authenticate_client(
            &request(Some("conf-client"), Some("secret-one")),
            None,
            &storage(),
        )
        .await
        .unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::ClientSecretPost);
    }

    #[tokio::test]
    async fn test_uniform_failure_messages() {
        // Unknown client, wrong secret, and missing credentials for a
        // confidential client must be indistinguishable on the wire.
        let cases = [
            authenticate_client(&request(Some("nope"), Some("x")), None, &storage()).await,
            authenticate_client(
                &request(Some("conf-client"), Some("wrong")),
                None,
                &storage(),
            )
            .await,
            authenticate_client(&request(Some("conf-client"), None), None, &storage()).await,
        ];
        for result in cases {
            let err = result.unwrap_err();
            assert_eq!(err.oauth_error_code(), "invalid_client");
            assert_eq!(err.error_description(), "Client authentication failed");
        }
    }

    #[tokio::test]
    async fn test_inactive_client_rejected() {
        let mut client = confidential_client();
        client.active = false;
        let storage = MockClientStorage {
            clients: vec![client],
        };
        let err = authenticate_client(
            &request(None, None),
            Some(("conf-client", "secret-one")),
            &storage,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_description(), "Client authentication failed");
    }

    #[tokio::test]
    async fn test_public_client_without_secret() {
        let result = authenticate_client(&request(Some("pub-client"), None), None, &storage())
            .await
            .unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::None);
    }

    #[tokio::test]
    async fn test_auth_method_allow_list() {
        let mut client = confidential_client();
        client.token_endpoint_auth_methods = vec![TokenEndpointAuthMethod::ClientSecretBasic];
        let storage = MockClientStorage {
            clients: vec![client],
        };
        // Post is outside the allow-list even with a correct secret.
        let err = authenticate_client(
            &request(Some("conf-client"), Some("secret-one")),
            None,
            &storage,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_description(), "Client authentication failed");
    }

    #[test]
    fn test_parse_basic_auth() {
        // base64("client:secret")
        assert_eq!(
            parse_basic_auth("Basic Y2xpZW50OnNlY3JldA=="),
            Some(("client".to_string(), "secret".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer token"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
        assert_eq!(parse_basic_auth("Basic bm9jb2xvbg=="), None);
    }
}
