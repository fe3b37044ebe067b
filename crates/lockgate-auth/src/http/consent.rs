//! Consent endpoint handler.

use axum::Form;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};
use uuid::Uuid;

use crate::http::{GatewayState, outcome_response};

/// `POST /{domain_id}/oauth/consent`
///
/// The consent page posts one `scope.<name>=true` field per approved
/// scope plus `user_oauth_approval` for the overall decision, so the
/// body is consumed as raw pairs rather than a fixed struct.
pub async fn consent_handler(
    State(state): State<GatewayState>,
    Path(domain_id): Path<String>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let mut flow_id = None;
    let mut approval_granted = false;
    let mut approved_scopes = Vec::new();

    for (key, value) in &fields {
        match key.as_str() {
            "flow" => flow_id = Uuid::parse_str(value).ok(),
            "user_oauth_approval" => approval_granted = value == "true",
            _ => {
                if let Some(scope) = key.strip_prefix("scope.") {
                    if value == "true" {
                        approved_scopes.push(scope.to_string());
                    }
                }
            }
        }
    }

    let Some(flow_id) = flow_id else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    debug!(domain_id, %flow_id, approval_granted, "processing consent");

    match state
        .authorization
        .consent(&domain_id, flow_id, approved_scopes, approval_granted)
        .await
    {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            error!(domain_id, error = %e, "consent processing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
