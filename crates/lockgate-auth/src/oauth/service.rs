//! Authorization endpoint request processor.
//!
//! Drives an authorization request through validation, login, consent
//! and issuance. Validation runs in a fixed order so the first failing
//! check determines the error surfaced, and errors split into two
//! delivery classes: before the redirect URI is validated they land on
//! the gateway-local error page, afterwards they are delivered to the
//! client's redirect URI in the query or fragment component.
//!
//! Scope validation is detected early but surfaced only after a
//! successful login, so an unauthenticated user agent never learns
//! which scopes a client may request.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::{AuditEvent, AuditSink};
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationRequest, ResponseMode, ResponseType, code_redirect_url, error_page_url,
    error_redirect_url, implicit_redirect_url,
};
use crate::oauth::flow::{
    AuthorizationCode, AuthorizationFlow, FlowStage, generate_code, generate_opaque_token,
};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::storage::{
    ApprovalStorage, ClientStorage, CodeStorage, DomainStorage, FlowStorage, ScopeApproval,
    SessionStorage, UserStorage,
};
use crate::token::issuer::{IssuanceRequest, TokenIssuer};
use crate::types::{Client, Domain, EndUserSession, GrantType};

/// Error page used when the domain itself cannot be resolved.
const FALLBACK_ERROR_PATH: &str = "/oauth/error";

/// Configuration for the authorization request processor.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// How long a login/consent round trip may take before the flow
    /// expires.
    pub flow_lifetime: Duration,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            flow_lifetime: Duration::minutes(10),
        }
    }
}

impl AuthorizationConfig {
    /// Sets the flow lifetime.
    #[must_use]
    pub fn with_flow_lifetime(mut self, lifetime: Duration) -> Self {
        self.flow_lifetime = lifetime;
        self
    }
}

/// What the gateway should do next with the user agent.
#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
    /// Send the user agent to the login page.
    RedirectToLogin {
        /// Flow to resume after login.
        flow_id: Uuid,
        /// Login page location.
        location: String,
    },
    /// Send the user agent to the consent page.
    RedirectToConsent {
        /// Flow to resume after consent.
        flow_id: Uuid,
        /// Consent page location.
        location: String,
        /// Scopes awaiting the user's decision.
        scopes: Vec<String>,
    },
    /// Deliver a response (success or error) to the client.
    Redirect {
        /// Full redirect URI including response parameters.
        location: String,
    },
    /// Show the gateway-local error page; the redirect URI was never
    /// trusted.
    ErrorPage {
        /// Error page location including error parameters.
        location: String,
    },
}

/// Drives authorization flows from request to response.
pub struct AuthorizationService {
    client_storage: Arc<dyn ClientStorage>,
    domain_storage: Arc<dyn DomainStorage>,
    code_storage: Arc<dyn CodeStorage>,
    flow_storage: Arc<dyn FlowStorage>,
    approval_storage: Arc<dyn ApprovalStorage>,
    user_storage: Arc<dyn UserStorage>,
    session_storage: Arc<dyn SessionStorage>,
    issuer: Arc<TokenIssuer>,
    audit: Arc<dyn AuditSink>,
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates the processor over its storages and collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_storage: Arc<dyn ClientStorage>,
        domain_storage: Arc<dyn DomainStorage>,
        code_storage: Arc<dyn CodeStorage>,
        flow_storage: Arc<dyn FlowStorage>,
        approval_storage: Arc<dyn ApprovalStorage>,
        user_storage: Arc<dyn UserStorage>,
        session_storage: Arc<dyn SessionStorage>,
        issuer: Arc<TokenIssuer>,
        audit: Arc<dyn AuditSink>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            client_storage,
            domain_storage,
            code_storage,
            flow_storage,
            approval_storage,
            user_storage,
            session_storage,
            issuer,
            audit,
            config,
        }
    }

    /// Processes an authorization endpoint request.
    ///
    /// `session` is the end-user session resolved from the request
    /// cookie, when one exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures; every protocol
    /// failure becomes an [`AuthorizeOutcome`].
    pub async fn authorize(
        &self,
        domain_id: &str,
        raw_query: &str,
        session: Option<&EndUserSession>,
    ) -> AuthResult<AuthorizeOutcome> {
        let Some(domain) = self.domain_storage.find_by_id(domain_id).await? else {
            return Ok(AuthorizeOutcome::ErrorPage {
                location: error_page_url(
                    FALLBACK_ERROR_PATH,
                    "invalid_request",
                    &format!("No domain found for id {domain_id}"),
                    None,
                ),
            });
        };
        if !domain.enabled {
            return Ok(self.error_page(
                &domain,
                &AuthError::access_denied("Domain is disabled"),
                None,
            ));
        }

        // 1. Duplicate parameters fail before anything else.
        let request = match AuthorizationRequest::from_query(raw_query) {
            Ok(request) => request,
            Err(err) => return Ok(self.error_page(&domain, &err, None)),
        };
        let state = request.state.as_deref();

        // 2. response_type.
        let response_type = match &request.response_type {
            None => {
                return Ok(self.error_page(
                    &domain,
                    &AuthError::invalid_request("Missing parameter: response_type"),
                    state,
                ));
            }
            Some(value) => match ResponseType::parse(value) {
                Some(rt) => rt,
                None => {
                    return Ok(self.error_page(
                        &domain,
                        &AuthError::unsupported_response_type(value),
                        state,
                    ));
                }
            },
        };

        // 3. client_id.
        let Some(client_id) = request.client_id.as_deref() else {
            return Ok(self.error_page(
                &domain,
                &AuthError::invalid_request("Missing parameter: client_id"),
                state,
            ));
        };
        let client = match self.client_storage.find_by_client_id(client_id).await? {
            Some(client) if client.active && client.domain_id == domain.id => client,
            _ => {
                return Ok(self.error_page(
                    &domain,
                    &AuthError::invalid_request(format!(
                        "No client found for client_id {client_id}"
                    )),
                    state,
                ));
            }
        };

        // 4. redirect_uri. A single registered URI may be implied.
        let redirect_uri = match request.redirect_uri.as_deref() {
            Some(uri) => {
                if !client.is_redirect_uri_allowed(uri, domain.redirect_uri_strict_matching) {
                    return Ok(self.error_page(
                        &domain,
                        &AuthError::redirect_uri_mismatch("Redirect URI mismatch."),
                        state,
                    ));
                }
                uri.to_string()
            }
            None if client.redirect_uris.len() == 1 => client.redirect_uris[0].clone(),
            None => {
                return Ok(self.error_page(
                    &domain,
                    &AuthError::invalid_request("Missing parameter: redirect_uri"),
                    state,
                ));
            }
        };

        // The redirect URI is trusted from here on; subsequent errors
        // are delivered to the client, in the query component or the
        // fragment per the selected response mode.
        let response_mode = request.selected_response_mode(response_type);

        // 5. The response type must map onto a grant the client holds.
        let required_grant = match response_type {
            ResponseType::Code => GrantType::AuthorizationCode,
            ResponseType::Token => GrantType::Implicit,
        };
        if !client.is_grant_type_allowed(required_grant) {
            return Ok(self.error_redirect(
                &domain,
                &redirect_uri,
                response_mode,
                &AuthError::unsupported_response_type(response_type.as_str()),
                state,
            ));
        }

        // 6. PKCE presence and method (scope stays deferred).
        let pkce = match self.validate_pkce(&client, &request, response_type) {
            Ok(pkce) => pkce,
            Err(err) => {
                return Ok(self.error_redirect(&domain, &redirect_uri, response_mode, &err, state));
            }
        };

        let now = OffsetDateTime::now_utc();
        let active_session = session.filter(|s| s.is_valid() && s.domain_id == domain.id);

        // 7. prompt=none forbids interaction.
        if request.prompt_none() && active_session.is_none() {
            return Ok(self.error_redirect(
                &domain,
                &redirect_uri,
                response_mode,
                &AuthError::LoginRequired,
                state,
            ));
        }

        let mut flow = AuthorizationFlow {
            id: Uuid::new_v4(),
            domain_id: domain.id.clone(),
            client_id: client.client_id.clone(),
            redirect_uri,
            requested_scopes: request.scopes(),
            state: request.state.clone(),
            response_type,
            response_mode,
            pkce,
            nonce: request.nonce.clone(),
            subject: None,
            stage: FlowStage::AwaitingLogin,
            created_at: now,
            expires_at: now + self.config.flow_lifetime,
        };

        if let Some(session) = active_session {
            // Session already authenticated the user; skip the login page.
            flow.subject = Some(session.subject.clone());
            flow.stage = FlowStage::AwaitingConsent;
            self.flow_storage.create(&flow).await?;
            return self.continue_after_login(&domain, &client, flow).await;
        }

        self.flow_storage.create(&flow).await?;
        Ok(AuthorizeOutcome::RedirectToLogin {
            flow_id: flow.id,
            location: format!("{}?flow={}", domain.login_path, flow.id),
        })
    }

    /// Handles a login page submission for a pending flow.
    ///
    /// On success the returned session must be attached to the user
    /// agent by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures.
    pub async fn login(
        &self,
        domain_id: &str,
        flow_id: Uuid,
        username: &str,
        password: &str,
    ) -> AuthResult<(AuthorizeOutcome, Option<EndUserSession>)> {
        let Some(domain) = self.domain_storage.find_by_id(domain_id).await? else {
            return Ok((
                AuthorizeOutcome::ErrorPage {
                    location: error_page_url(
                        FALLBACK_ERROR_PATH,
                        "invalid_request",
                        &format!("No domain found for id {domain_id}"),
                        None,
                    ),
                },
                None,
            ));
        };

        let Some(mut flow) = self.load_live_flow(&domain, flow_id).await? else {
            return Ok((
                self.error_page(
                    &domain,
                    &AuthError::invalid_request("The authorization flow is invalid or has expired"),
                    None,
                ),
                None,
            ));
        };

        let Some(user) = self
            .user_storage
            .authenticate(&domain.id, username, password)
            .await?
        else {
            self.audit
                .record(
                    &domain.id,
                    OffsetDateTime::now_utc(),
                    AuditEvent::UserLoginFailed {
                        username: username.to_string(),
                        client_id: flow.client_id.clone(),
                    },
                )
                .await;
            // Wrong credentials loop back to the login page.
            let location = format!(
                "{}?flow={}&{}",
                domain.login_path,
                flow.id,
                url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("error", "The credentials entered are invalid")
                    .finish()
            );
            return Ok((
                AuthorizeOutcome::RedirectToLogin {
                    flow_id: flow.id,
                    location,
                },
                None,
            ));
        };

        self.audit
            .record(
                &domain.id,
                OffsetDateTime::now_utc(),
                AuditEvent::UserLoggedIn {
                    subject: user.id.clone(),
                    client_id: flow.client_id.clone(),
                },
            )
            .await;

        let now = OffsetDateTime::now_utc();
        let session = EndUserSession {
            token: generate_opaque_token(),
            subject: user.id.clone(),
            domain_id: domain.id.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(domain.session_lifetime),
        };
        self.session_storage.create(&session).await?;

        flow.subject = Some(user.id);
        flow.stage = FlowStage::AwaitingConsent;
        self.flow_storage.update(&flow).await?;

        let Some(client) = self.find_flow_client(&flow).await? else {
            return Ok((
                self.error_page(
                    &domain,
                    &AuthError::invalid_request(format!(
                        "No client found for client_id {}",
                        flow.client_id
                    )),
                    flow.state.as_deref(),
                ),
                Some(session),
            ));
        };

        let outcome = self.continue_after_login(&domain, &client, flow).await?;
        Ok((outcome, Some(session)))
    }

    /// Handles a consent page submission for a pending flow.
    ///
    /// `approved_scopes` are the scopes the user ticked;
    /// `approval_granted` is the overall decision.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures.
    pub async fn consent(
        &self,
        domain_id: &str,
        flow_id: Uuid,
        approved_scopes: Vec<String>,
        approval_granted: bool,
    ) -> AuthResult<AuthorizeOutcome> {
        let Some(domain) = self.domain_storage.find_by_id(domain_id).await? else {
            return Ok(AuthorizeOutcome::ErrorPage {
                location: error_page_url(
                    FALLBACK_ERROR_PATH,
                    "invalid_request",
                    &format!("No domain found for id {domain_id}"),
                    None,
                ),
            });
        };

        let Some(flow) = self.load_live_flow(&domain, flow_id).await? else {
            return Ok(self.error_page(
                &domain,
                &AuthError::invalid_request("The authorization flow is invalid or has expired"),
                None,
            ));
        };

        let Some(subject) = flow.subject.clone() else {
            return Ok(self.error_page(
                &domain,
                &AuthError::invalid_request("The authorization flow is invalid or has expired"),
                flow.state.as_deref(),
            ));
        };

        let Some(client) = self.find_flow_client(&flow).await? else {
            return Ok(self.error_page(
                &domain,
                &AuthError::invalid_request(format!(
                    "No client found for client_id {}",
                    flow.client_id
                )),
                flow.state.as_deref(),
            ));
        };

        self.audit
            .record(
                &domain.id,
                OffsetDateTime::now_utc(),
                AuditEvent::ConsentDecision {
                    subject: subject.clone(),
                    client_id: client.client_id.clone(),
                    approved: approval_granted,
                    scopes: approved_scopes.clone(),
                },
            )
            .await;

        if !approval_granted {
            self.flow_storage.delete(flow.id).await?;
            return Ok(self.error_redirect(
                &domain,
                &flow.redirect_uri,
                flow.response_mode,
                &AuthError::access_denied("User denied access"),
                flow.state.as_deref(),
            ));
        }

        // Persist the new approvals with their per-scope lifetimes.
        let now = OffsetDateTime::now_utc();
        let effective = self.effective_scopes(&client, &flow);
        for scope in &approved_scopes {
            if !effective.contains(scope) {
                continue;
            }
            let expires_at = client
                .scope_setting(scope)
                .and_then(|s| s.expires_in)
                .map(|secs| now + Duration::seconds(secs));
            self.approval_storage
                .save(&ScopeApproval {
                    user_id: subject.clone(),
                    client_id: client.client_id.clone(),
                    domain_id: domain.id.clone(),
                    scope: scope.clone(),
                    granted_at: now,
                    expires_at,
                })
                .await?;
        }

        // Grant the subset of the request that now has active approvals.
        let granted = self
            .approved_subset(&client, &subject, &effective)
            .await?;

        self.issue_final(&domain, &client, flow, granted).await
    }

    // =========================================================================
    // Internal steps
    // =========================================================================

    /// Runs the post-login steps: deferred scope validation, consent
    /// gating, issuance.
    async fn continue_after_login(
        &self,
        domain: &Domain,
        client: &Client,
        flow: AuthorizationFlow,
    ) -> AuthResult<AuthorizeOutcome> {
        // Deferred scope check: surfaced only now, on the client redirect.
        let unknown: Vec<&str> = flow
            .requested_scopes
            .iter()
            .filter(|s| !client.is_scope_allowed(s))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            let err = AuthError::invalid_scope(format!("Invalid scope(s): {}", unknown.join(" ")));
            self.flow_storage.delete(flow.id).await?;
            return Ok(self.error_redirect(
                domain,
                &flow.redirect_uri,
                flow.response_mode,
                &err,
                flow.state.as_deref(),
            ));
        }

        let subject = flow.subject.clone().unwrap_or_default();
        let effective = self.effective_scopes(client, &flow);

        // Consent is skipped when every scope has an active approval.
        let approved = self.approved_subset(client, &subject, &effective).await?;
        let pending: Vec<String> = effective
            .iter()
            .filter(|s| !approved.contains(s))
            .cloned()
            .collect();

        if pending.is_empty() {
            return self.issue_final(domain, client, flow, effective).await;
        }

        self.flow_storage.update(&flow).await?;
        Ok(AuthorizeOutcome::RedirectToConsent {
            flow_id: flow.id,
            location: format!("{}?flow={}", domain.consent_path, flow.id),
            scopes: pending,
        })
    }

    /// Produces the final response for an authorized flow.
    async fn issue_final(
        &self,
        domain: &Domain,
        client: &Client,
        flow: AuthorizationFlow,
        scopes: Vec<String>,
    ) -> AuthResult<AuthorizeOutcome> {
        let subject = flow.subject.clone().unwrap_or_default();
        self.flow_storage.delete(flow.id).await?;

        match flow.response_type {
            ResponseType::Code => {
                let now = OffsetDateTime::now_utc();
                let code = AuthorizationCode {
                    code: generate_code(),
                    client_id: client.client_id.clone(),
                    redirect_uri: flow.redirect_uri.clone(),
                    scopes,
                    subject,
                    pkce: flow.pkce.clone(),
                    nonce: flow.nonce.clone(),
                    created_at: now,
                    expires_at: now + Duration::seconds(domain.authorization_code_lifetime),
                };
                self.code_storage.create(&code).await?;

                tracing::debug!(
                    client_id = %client.client_id,
                    flow_id = %flow.id,
                    "authorization code issued"
                );

                let location = code_redirect_url(
                    &flow.redirect_uri,
                    flow.response_mode,
                    &code.code,
                    flow.state.as_deref(),
                )?;
                Ok(AuthorizeOutcome::Redirect { location })
            }
            ResponseType::Token => {
                let response = self
                    .issuer
                    .issue(
                        client,
                        domain,
                        IssuanceRequest {
                            subject: Some(subject.clone()),
                            scopes: scopes.clone(),
                            // Implicit never yields a refresh token.
                            with_refresh_token: false,
                            nonce: flow.nonce.clone(),
                        },
                    )
                    .await?;

                self.audit
                    .record(
                        &domain.id,
                        OffsetDateTime::now_utc(),
                        AuditEvent::TokensIssued {
                            client_id: client.client_id.clone(),
                            subject: Some(subject),
                            grant_type: GrantType::Implicit.as_str().to_string(),
                            scopes,
                        },
                    )
                    .await;

                let location = implicit_redirect_url(
                    &flow.redirect_uri,
                    &response.access_token,
                    &response.token_type,
                    response.expires_in,
                    response.scope.as_deref(),
                    flow.state.as_deref(),
                )?;
                Ok(AuthorizeOutcome::Redirect { location })
            }
        }
    }

    fn validate_pkce(
        &self,
        client: &Client,
        request: &AuthorizationRequest,
        response_type: ResponseType,
    ) -> Result<Option<PkceChallenge>, AuthError> {
        let Some(challenge) = request.code_challenge.as_deref() else {
            if client.requires_pkce() && response_type == ResponseType::Code {
                return Err(AuthError::invalid_request("Missing parameter: code_challenge"));
            }
            return Ok(None);
        };

        let method = match request.code_challenge_method.as_deref() {
            None => PkceChallengeMethod::default(),
            Some(value) => PkceChallengeMethod::parse(value).ok_or_else(|| {
                AuthError::invalid_request("Invalid parameter: code_challenge_method")
            })?,
        };

        if client.force_s256_code_challenge_method && method != PkceChallengeMethod::S256 {
            return Err(AuthError::invalid_request(
                "Invalid parameter: code_challenge_method",
            ));
        }

        Ok(Some(PkceChallenge::new(challenge, method)))
    }

    /// Requested scopes, or the client's defaults when none were sent.
    fn effective_scopes(&self, client: &Client, flow: &AuthorizationFlow) -> Vec<String> {
        if flow.requested_scopes.is_empty() {
            client.default_scopes()
        } else {
            flow.requested_scopes.clone()
        }
    }

    /// The subset of `scopes` the user has active approvals for.
    async fn approved_subset(
        &self,
        client: &Client,
        subject: &str,
        scopes: &[String],
    ) -> AuthResult<Vec<String>> {
        let approvals = self
            .approval_storage
            .find(subject, &client.client_id)
            .await?;
        Ok(scopes
            .iter()
            .filter(|scope| {
                approvals
                    .iter()
                    .any(|a| a.scope == **scope && a.is_active())
            })
            .cloned()
            .collect())
    }

    async fn load_live_flow(
        &self,
        domain: &Domain,
        flow_id: Uuid,
    ) -> AuthResult<Option<AuthorizationFlow>> {
        let Some(flow) = self.flow_storage.find_by_id(flow_id).await? else {
            return Ok(None);
        };
        if flow.domain_id != domain.id || flow.is_expired() {
            self.flow_storage.delete(flow.id).await?;
            return Ok(None);
        }
        Ok(Some(flow))
    }

    async fn find_flow_client(&self, flow: &AuthorizationFlow) -> AuthResult<Option<Client>> {
        Ok(self
            .client_storage
            .find_by_client_id(&flow.client_id)
            .await?
            .filter(|c| c.active && c.domain_id == flow.domain_id))
    }

    fn error_page(
        &self,
        domain: &Domain,
        error: &AuthError,
        state: Option<&str>,
    ) -> AuthorizeOutcome {
        tracing::debug!(domain_id = %domain.id, error = %error, "authorization rejected before redirect");
        AuthorizeOutcome::ErrorPage {
            location: error_page_url(
                &domain.error_path,
                error.oauth_error_code(),
                &error.error_description(),
                state,
            ),
        }
    }

    fn error_redirect(
        &self,
        domain: &Domain,
        redirect_uri: &str,
        mode: ResponseMode,
        error: &AuthError,
        state: Option<&str>,
    ) -> AuthorizeOutcome {
        tracing::debug!(domain_id = %domain.id, error = %error, "authorization rejected");
        match error_redirect_url(
            redirect_uri,
            mode,
            error.oauth_error_code(),
            &error.error_description(),
            state,
        ) {
            Ok(location) => AuthorizeOutcome::Redirect { location },
            // The redirect URI was validated, so this is unreachable in
            // practice; fall back to the error page.
            Err(_) => self.error_page(domain, error, state),
        }
    }
}

impl std::fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
