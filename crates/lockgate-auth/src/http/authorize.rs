//! Authorization endpoint handler.

use axum::extract::{Path, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::http::{GatewayState, outcome_response, session_token_from_cookies};
use crate::types::EndUserSession;

/// `GET /{domain_id}/oauth/authorize`
///
/// Resolves the end-user session from the request cookie and hands the
/// raw query string to the processor; parsing stays inside the engine
/// so duplicate parameters can be detected.
pub async fn authorize_handler(
    State(state): State<GatewayState>,
    Path(domain_id): Path<String>,
    headers: axum::http::HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    debug!(domain_id, "processing authorization request");

    let session = resolve_session(&state, &headers).await;

    match state
        .authorization
        .authorize(&domain_id, &query, session.as_ref())
        .await
    {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            error!(domain_id, error = %e, "authorization processing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Looks up a live session for the request, if the cookie names one.
pub(crate) async fn resolve_session(
    state: &GatewayState,
    headers: &axum::http::HeaderMap,
) -> Option<EndUserSession> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = session_token_from_cookies(cookie_header)?;
    match state.session_storage.find_by_token(token).await {
        Ok(session) => session.filter(EndUserSession::is_valid),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            None
        }
    }
}
