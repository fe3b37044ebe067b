//! HTTP handlers for the gateway endpoints.
//!
//! Four endpoints per domain: authorize, login, consent and token.
//! Handlers translate between the wire and the sub-engines; no flow
//! logic lives here.

pub mod authorize;
pub mod consent;
pub mod login;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};

use crate::audit::AuditSink;
use crate::oauth::service::{AuthorizationService, AuthorizeOutcome};
use crate::storage::{ClientStorage, DomainStorage, SessionStorage};
use crate::token::service::TokenService;

/// Name of the gateway session cookie.
pub const SESSION_COOKIE: &str = "LOCKGATE_SESSION";

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Authorization request processor.
    pub authorization: Arc<AuthorizationService>,
    /// Grant evaluator for the token endpoint.
    pub token_service: Arc<TokenService>,
    /// Client lookups for token endpoint authentication.
    pub client_storage: Arc<dyn ClientStorage>,
    /// Domain lookups.
    pub domain_storage: Arc<dyn DomainStorage>,
    /// Session lookups for the authorize endpoint.
    pub session_storage: Arc<dyn SessionStorage>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
}

/// Builds the per-domain gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/{domain_id}/oauth/authorize",
            get(authorize::authorize_handler),
        )
        .route("/{domain_id}/login", post(login::login_handler))
        .route("/{domain_id}/oauth/consent", post(consent::consent_handler))
        .route("/{domain_id}/oauth/token", post(token::token_handler))
        .with_state(state)
}

/// Extracts the session token from a Cookie header value.
#[must_use]
pub(crate) fn session_token_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })
}

/// Builds a 302 response to the given location.
pub(crate) fn found(location: &str) -> Response {
    let mut response = Response::new(axum::body::Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    } else {
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    }
    response
}

/// Maps an authorize outcome to its HTTP response.
pub(crate) fn outcome_response(outcome: &AuthorizeOutcome) -> Response {
    match outcome {
        AuthorizeOutcome::RedirectToLogin { location, .. }
        | AuthorizeOutcome::RedirectToConsent { location, .. }
        | AuthorizeOutcome::Redirect { location }
        | AuthorizeOutcome::ErrorPage { location } => found(location),
    }
}
