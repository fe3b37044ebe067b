//! Token and scope issuer.
//!
//! Single exit point for minting: every grant that succeeds ends up
//! here, so the wire invariants (lowercase `bearer`, sorted scope
//! string, omitted-when-empty scope field) hold for all of them.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::oauth::flow::generate_opaque_token;
use crate::oauth::token::TokenResponse;
use crate::storage::RefreshTokenStorage;
use crate::token::jwt::{AccessTokenClaims, IdTokenClaims, JwtService};
use crate::types::{Client, Domain, RefreshToken};

/// Hashes a refresh token value for storage and lookup.
#[must_use]
pub fn hash_refresh_token(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(raw.as_bytes()))
}

/// What to mint for a successful grant.
#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    /// Authenticated subject, absent for client-only grants.
    pub subject: Option<String>,

    /// Granted scopes, not yet normalized.
    pub scopes: Vec<String>,

    /// Whether a refresh token accompanies the access token.
    pub with_refresh_token: bool,

    /// OIDC nonce to bind into the ID token.
    pub nonce: Option<String>,
}

/// Mints token responses for every grant.
pub struct TokenIssuer {
    jwt: Arc<JwtService>,
    refresh_storage: Arc<dyn RefreshTokenStorage>,
}

impl TokenIssuer {
    /// Creates an issuer over the given JWT service and refresh store.
    pub fn new(jwt: Arc<JwtService>, refresh_storage: Arc<dyn RefreshTokenStorage>) -> Self {
        Self {
            jwt,
            refresh_storage,
        }
    }

    /// Issues a token response for a completed grant.
    ///
    /// Scopes are deduplicated and sorted; the response omits the
    /// `scope` field entirely when nothing was granted. An ID token is
    /// minted only when `openid` was granted to a user subject.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or refresh token persistence fails.
    pub async fn issue(
        &self,
        client: &Client,
        domain: &Domain,
        request: IssuanceRequest,
    ) -> AuthResult<TokenResponse> {
        let mut scopes = request.scopes;
        scopes.sort();
        scopes.dedup();

        let scope = if scopes.is_empty() {
            None
        } else {
            Some(scopes.join(" "))
        };

        let now = OffsetDateTime::now_utc();
        let access_lifetime = client.access_token_lifetime_secs(domain.access_token_lifetime);

        let claims = AccessTokenClaims {
            iss: self.jwt.issuer().to_string(),
            sub: request.subject.clone(),
            aud: client.client_id.clone(),
            client_id: client.client_id.clone(),
            scope: scope.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::seconds(access_lifetime)).unix_timestamp(),
        };
        let access_token = self.jwt.sign(&claims)?;

        let refresh_token = if request.with_refresh_token {
            Some(
                self.mint_refresh_token(client, domain, request.subject.as_deref(), &scopes)
                    .await?,
            )
        } else {
            None
        };

        let id_token = match (&request.subject, &scope) {
            (Some(subject), Some(scope_str)) if scope_str.split(' ').any(|s| s == "openid") => {
                Some(self.mint_id_token(
                    client,
                    subject,
                    request.nonce.as_deref(),
                    now,
                    access_lifetime,
                )?)
            }
            _ => None,
        };

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: access_lifetime.max(1) as u64,
            scope,
            refresh_token,
            id_token,
        })
    }

    async fn mint_refresh_token(
        &self,
        client: &Client,
        domain: &Domain,
        subject: Option<&str>,
        scopes: &[String],
    ) -> AuthResult<String> {
        let raw = generate_opaque_token();
        let now = OffsetDateTime::now_utc();
        let lifetime = client.refresh_token_lifetime_secs(domain.refresh_token_lifetime);

        let record = RefreshToken {
            token_hash: hash_refresh_token(&raw),
            client_id: client.client_id.clone(),
            subject: subject.map(str::to_string),
            scopes: scopes.to_vec(),
            created_at: now,
            expires_at: now + Duration::seconds(lifetime),
            revoked_at: None,
        };
        self.refresh_storage.create(&record).await?;

        Ok(raw)
    }

    fn mint_id_token(
        &self,
        client: &Client,
        subject: &str,
        nonce: Option<&str>,
        now: OffsetDateTime,
        lifetime: i64,
    ) -> AuthResult<String> {
        let claims = IdTokenClaims {
            iss: self.jwt.issuer().to_string(),
            sub: subject.to_string(),
            aud: client.client_id.clone(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::seconds(lifetime)).unix_timestamp(),
            nonce: nonce.map(str::to_string),
            extra: client.id_token_custom_claims.clone(),
        };
        self.jwt.sign(&claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}
