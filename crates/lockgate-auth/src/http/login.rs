//! Login endpoint handler.

use axum::Form;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::http::{GatewayState, SESSION_COOKIE, outcome_response};

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The flow being resumed.
    pub flow: Uuid,
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// `POST /{domain_id}/login`
///
/// Authenticates the end user for a pending flow. A successful login
/// attaches the session cookie to the redirect that continues the flow.
pub async fn login_handler(
    State(state): State<GatewayState>,
    Path(domain_id): Path<String>,
    Form(form): Form<LoginForm>,
) -> Response {
    debug!(domain_id, flow_id = %form.flow, "processing login");

    match state
        .authorization
        .login(&domain_id, form.flow, &form.username, &form.password)
        .await
    {
        Ok((outcome, session)) => {
            let mut response = outcome_response(&outcome);
            if let Some(session) = session {
                let cookie = format!(
                    "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
                    session.token
                );
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().insert(header::SET_COOKIE, value);
                    }
                    Err(e) => {
                        error!(error = %e, "session cookie construction failed");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                }
            }
            response
        }
        Err(e) => {
            error!(domain_id, error = %e, "login processing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
