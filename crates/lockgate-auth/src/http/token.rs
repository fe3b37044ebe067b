//! Token endpoint handler.
//!
//! ```text
//! POST /{domain_id}/oauth/token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=http://localhost:4000/
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! ```

use axum::Form;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::audit::AuditEvent;
use crate::error::AuthError;
use crate::http::GatewayState;
use crate::oauth::client_auth::{authenticate_client, parse_basic_auth};
use crate::oauth::token::{TokenErrorResponse, TokenRequest};

/// `POST /{domain_id}/oauth/token`
///
/// Authenticates the client, dispatches the grant and answers with the
/// token response or an RFC 6749 error body.
pub async fn token_handler(
    State(state): State<GatewayState>,
    Path(domain_id): Path<String>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    debug!(
        domain_id,
        grant_type = ?request.grant_type,
        client_id = ?request.client_id,
        "processing token request"
    );

    let domain = match state.domain_storage.find_by_id(&domain_id).await {
        Ok(Some(domain)) if domain.enabled => domain,
        Ok(_) => {
            return token_error_response(&AuthError::invalid_request(format!(
                "No domain found for id {domain_id}"
            )));
        }
        Err(e) => {
            error!(domain_id, error = %e, "domain lookup failed");
            return token_error_response(&e);
        }
    };

    // A present but malformed Basic header fails outright; it must not
    // fall through to body credentials.
    let basic_auth = match headers.get(header::AUTHORIZATION) {
        Some(value) => {
            let parsed = value.to_str().ok().and_then(parse_basic_auth);
            match parsed {
                Some(credentials) => Some(credentials),
                None => {
                    return token_error_response(&AuthError::invalid_client(
                        "Client authentication failed",
                    ));
                }
            }
        }
        None => None,
    };
    let basic_auth = basic_auth
        .as_ref()
        .map(|(id, secret)| (id.as_str(), secret.as_str()));

    let authenticated =
        match authenticate_client(&request, basic_auth, state.client_storage.as_ref()).await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                warn!(domain_id, error = %e, "client authentication failed");
                state
                    .audit
                    .record(
                        &domain_id,
                        OffsetDateTime::now_utc(),
                        AuditEvent::ClientAuthenticationFailed {
                            client_id: request.client_id.clone(),
                        },
                    )
                    .await;
                return token_error_response(&e);
            }
        };

    let client = &authenticated.client;
    if client.domain_id != domain.id {
        return token_error_response(&AuthError::invalid_client("Client authentication failed"));
    }

    state
        .audit
        .record(
            &domain_id,
            OffsetDateTime::now_utc(),
            AuditEvent::ClientAuthenticated {
                client_id: client.client_id.clone(),
                auth_method: authenticated.auth_method.to_string(),
            },
        )
        .await;

    match state.token_service.exchange(&domain, client, &request).await {
        Ok(outcome) => {
            info!(
                domain_id,
                client_id = %client.client_id,
                grant_type = ?request.grant_type,
                subject = ?outcome.subject,
                "tokens issued"
            );
            state
                .audit
                .record(
                    &domain_id,
                    OffsetDateTime::now_utc(),
                    AuditEvent::TokensIssued {
                        client_id: client.client_id.clone(),
                        subject: outcome.subject.clone(),
                        grant_type: request.grant_type.clone().unwrap_or_default(),
                        scopes: outcome
                            .response
                            .scope
                            .as_deref()
                            .map(|s| s.split(' ').map(str::to_string).collect())
                            .unwrap_or_default(),
                    },
                )
                .await;
            Json(outcome.response).into_response()
        }
        Err(e) => {
            debug!(domain_id, client_id = %client.client_id, error = %e, "grant rejected");
            state
                .audit
                .record(
                    &domain_id,
                    OffsetDateTime::now_utc(),
                    AuditEvent::GrantRejected {
                        client_id: Some(client.client_id.clone()),
                        error: e.oauth_error_code().to_string(),
                    },
                )
                .await;
            token_error_response(&e)
        }
    }
}

/// Maps an engine error to the RFC 6749 JSON error response.
pub fn token_error_response(error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = TokenErrorResponse::from_error(error);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = token_error_response(&AuthError::invalid_client(
            "Client authentication failed",
        ));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "invalid_client");
        assert_eq!(json["error_description"], "Client authentication failed");
    }

    #[tokio::test]
    async fn test_server_errors_do_not_leak() {
        let response = token_error_response(&AuthError::storage("connection pool exhausted"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "server_error");
        assert_eq!(json["error_description"], "Internal server error");
    }
}
