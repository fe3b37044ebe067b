//! Grant evaluator for the token endpoint.
//!
//! Dispatches an authenticated token request to the matching grant
//! handler. The `grant_type` string is closed into [`GrantType`] before
//! dispatch, and a grant missing from the client's allow-list answers
//! exactly like an unknown one.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::{CodeStorage, RefreshTokenStorage, UserStorage};
use crate::token::issuer::{IssuanceRequest, TokenIssuer, hash_refresh_token};
use crate::types::{Client, Domain, GrantType, RefreshToken};

/// Configuration for the grant evaluator.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// When `true`, each refresh revokes the presented token and issues
    /// a replacement.
    pub rotate_refresh_tokens: bool,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            rotate_refresh_tokens: true,
        }
    }
}

impl TokenServiceConfig {
    /// Sets refresh token rotation.
    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }
}

/// A successful grant evaluation.
///
/// Carries the wire response together with the subject the tokens are
/// bound to, so callers can audit user-bound and machine tokens apart.
#[derive(Debug, Clone)]
pub struct GrantOutcome {
    /// The RFC 6749 token response body.
    pub response: TokenResponse,
    /// Resolved subject; `None` for client credentials tokens.
    pub subject: Option<String>,
}

/// Evaluates token endpoint grants for an authenticated client.
pub struct TokenService {
    code_storage: Arc<dyn CodeStorage>,
    refresh_storage: Arc<dyn RefreshTokenStorage>,
    user_storage: Arc<dyn UserStorage>,
    issuer: Arc<TokenIssuer>,
    config: TokenServiceConfig,
}

impl TokenService {
    /// Creates a grant evaluator over the given storages and issuer.
    pub fn new(
        code_storage: Arc<dyn CodeStorage>,
        refresh_storage: Arc<dyn RefreshTokenStorage>,
        user_storage: Arc<dyn UserStorage>,
        issuer: Arc<TokenIssuer>,
        config: TokenServiceConfig,
    ) -> Self {
        Self {
            code_storage,
            refresh_storage,
            user_storage,
            issuer,
            config,
        }
    }

    /// Evaluates a token request for an already authenticated client.
    ///
    /// # Errors
    ///
    /// Returns the grant-specific OAuth error; see the individual
    /// handlers.
    pub async fn exchange(
        &self,
        domain: &Domain,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantOutcome> {
        // 1. Close the grant_type string into the enum.
        let raw_grant = request
            .grant_type
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: grant_type"))?;

        let grant_type = GrantType::parse(raw_grant)
            .ok_or_else(|| AuthError::unsupported_grant_type(raw_grant))?;

        // 2. A grant outside the client's allow-list answers exactly
        //    like an unknown one.
        if !client.is_grant_type_allowed(grant_type) {
            return Err(AuthError::unsupported_grant_type(raw_grant));
        }

        tracing::debug!(
            client_id = %client.client_id,
            grant_type = %grant_type,
            "evaluating token grant"
        );

        match grant_type {
            GrantType::AuthorizationCode => self.exchange_code(domain, client, request).await,
            GrantType::ClientCredentials => self.client_credentials(domain, client, request).await,
            GrantType::Password => self.password(domain, client, request).await,
            GrantType::RefreshToken => self.refresh(domain, client, request).await,
            // response_type=token never reaches the token endpoint.
            GrantType::Implicit => Err(AuthError::unsupported_grant_type(raw_grant)),
        }
    }

    /// Redeems an authorization code.
    async fn exchange_code(
        &self,
        domain: &Domain,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantOutcome> {
        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: code"))?;

        // 1. Atomic consume: concurrent redemptions resolve to one winner.
        let Some(code) = self.code_storage.consume(code_value).await? else {
            return Err(invalid_code(code_value));
        };

        // 2. Expired codes are already removed from storage by the
        //    consume above, so replaying them cannot succeed later.
        if code.is_expired() {
            return Err(invalid_code(code_value));
        }

        // 3. The code is bound to the client it was issued to.
        if code.client_id != client.client_id {
            return Err(invalid_code(code_value));
        }

        // 4. redirect_uri must repeat the authorization request value.
        if request.redirect_uri.as_deref() != Some(code.redirect_uri.as_str()) {
            return Err(AuthError::invalid_grant("Redirect URI mismatch."));
        }

        // 5. PKCE verification against the stored challenge.
        if let Some(challenge) = &code.pkce {
            let verifier = request
                .code_verifier
                .as_deref()
                .ok_or_else(|| AuthError::invalid_request("Missing parameter: code_verifier"))?;
            if !challenge.verify(verifier) {
                return Err(AuthError::invalid_grant("Invalid parameter: code_verifier"));
            }
        }

        let with_refresh = client.is_grant_type_allowed(GrantType::RefreshToken);
        let subject = code.subject.clone();
        let response = self
            .issuer
            .issue(
                client,
                domain,
                IssuanceRequest {
                    subject: Some(code.subject),
                    scopes: code.scopes,
                    with_refresh_token: with_refresh,
                    nonce: code.nonce,
                },
            )
            .await?;
        Ok(GrantOutcome {
            response,
            subject: Some(subject),
        })
    }

    /// Client credentials grant: no user, no refresh token.
    async fn client_credentials(
        &self,
        domain: &Domain,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantOutcome> {
        // An absent scope parameter grants nothing; client defaults do
        // not apply to machine tokens.
        let scopes = match request.scopes() {
            Some(requested) => {
                check_scopes(client, &requested)?;
                requested
            }
            None => vec![],
        };

        let response = self
            .issuer
            .issue(
                client,
                domain,
                IssuanceRequest {
                    subject: None,
                    scopes,
                    with_refresh_token: false,
                    nonce: None,
                },
            )
            .await?;
        Ok(GrantOutcome {
            response,
            subject: None,
        })
    }

    /// Resource owner password credentials grant.
    async fn password(
        &self,
        domain: &Domain,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantOutcome> {
        let username = request
            .username
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: username"))?;
        let password = request
            .password
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: password"))?;

        let Some(user) = self
            .user_storage
            .authenticate(&domain.id, username, password)
            .await?
        else {
            return Err(AuthError::invalid_grant("The credentials entered are invalid"));
        };

        let scopes = match request.scopes() {
            Some(requested) => {
                check_scopes(client, &requested)?;
                requested
            }
            None => client.default_scopes(),
        };

        let with_refresh = client.is_grant_type_allowed(GrantType::RefreshToken);
        let subject = user.id.clone();
        let response = self
            .issuer
            .issue(
                client,
                domain,
                IssuanceRequest {
                    subject: Some(user.id),
                    scopes,
                    with_refresh_token: with_refresh,
                    nonce: None,
                },
            )
            .await?;
        Ok(GrantOutcome {
            response,
            subject: Some(subject),
        })
    }

    /// Refresh token grant, with optional rotation and scope narrowing.
    async fn refresh(
        &self,
        domain: &Domain,
        client: &Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantOutcome> {
        let raw = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: refresh_token"))?;

        let hash = hash_refresh_token(raw);
        let Some(stored) = self.refresh_storage.find_by_hash(&hash).await? else {
            return Err(AuthError::invalid_grant("The refresh token is invalid."));
        };

        if !stored.is_valid() || stored.client_id != client.client_id {
            return Err(AuthError::invalid_grant("The refresh token is invalid."));
        }

        // Scope narrowing: a refresh may request a subset of the
        // original grant, never an extension.
        let scopes = match request.scopes() {
            Some(requested) => {
                let unknown: Vec<&str> = requested
                    .iter()
                    .filter(|s| !stored.scopes.contains(s))
                    .map(String::as_str)
                    .collect();
                if !unknown.is_empty() {
                    return Err(AuthError::invalid_scope(format!(
                        "Invalid scope(s): {}",
                        unknown.join(" ")
                    )));
                }
                requested
            }
            None => stored.scopes.clone(),
        };

        if self.config.rotate_refresh_tokens {
            self.refresh_storage.revoke(&hash).await?;
        }

        let subject = stored.subject.clone();
        let response = self
            .issuer
            .issue(
                client,
                domain,
                IssuanceRequest {
                    subject: stored.subject,
                    scopes,
                    with_refresh_token: self.config.rotate_refresh_tokens,
                    nonce: None,
                },
            )
            .await?;
        Ok(GrantOutcome { response, subject })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn invalid_code(code: &str) -> AuthError {
    AuthError::invalid_grant(format!("The authorization code {code} is invalid."))
}

fn check_scopes(client: &Client, requested: &[String]) -> AuthResult<()> {
    let unknown: Vec<&str> = requested
        .iter()
        .filter(|s| !client.is_scope_allowed(s))
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AuthError::invalid_scope(format!(
            "Invalid scope(s): {}",
            unknown.join(" ")
        )))
    }
}
