//! Authentication and authorization error types.
//!
//! This module defines all error types that can occur while evaluating
//! OAuth 2.0 flows. Every variant maps onto a wire-level OAuth error code
//! via [`AuthError::oauth_error_code`]; server-side failures (storage,
//! configuration, identity provider) collapse to `server_error` and never
//! leak internals onto the wire.

use std::fmt;

/// Errors that can occur during authorization flow evaluation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is malformed: missing/duplicated parameters or invalid values.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client authentication failed (unknown client or bad credentials).
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization grant (code, refresh token, resource-owner
    /// credentials) is invalid, expired, revoked, or bound to another client.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested scope is unknown or not authorized for the client.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The supplied redirect_uri does not match a registered URI.
    #[error("Redirect URI mismatch: {message}")]
    RedirectUriMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The authorization server does not support the requested grant type,
    /// or the client has not been granted it.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// End-user authentication is required but no session exists
    /// (`prompt=none` on the authorization endpoint).
    #[error("Login required")]
    LoginRequired,

    /// The resource owner denied the authorization request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// An error occurred while storing or retrieving flow state.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// The identity provider collaborator failed.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `RedirectUriMismatch` error.
    #[must_use]
    pub fn redirect_uri_mismatch(message: impl Into<String>) -> Self {
        Self::RedirectUriMismatch {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
                | Self::IdentityProvider { .. }
        )
    }

    /// Returns the OAuth 2.0 error code for this error.
    ///
    /// These are the exact strings that appear in the `error` field of
    /// token endpoint bodies and redirect query/fragment parameters.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::RedirectUriMismatch { .. } => "redirect_uri_mismatch",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::LoginRequired => "login_required",
            Self::AccessDenied { .. } => "access_denied",
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::IdentityProvider { .. } => "server_error",
        }
    }

    /// Returns the `error_description` to place on the wire.
    ///
    /// Server-side failures return a generic description; their details
    /// belong in logs, never in responses.
    #[must_use]
    pub fn error_description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::InvalidScope { message }
            | Self::RedirectUriMismatch { message }
            | Self::AccessDenied { message } => message.clone(),
            Self::UnsupportedResponseType { response_type } => {
                format!("Unsupported response type: {response_type}")
            }
            Self::UnsupportedGrantType { grant_type } => {
                format!("Unsupported grant type: {grant_type}")
            }
            Self::LoginRequired => "Login required".to_string(),
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::IdentityProvider { .. } => "Internal server error".to_string(),
        }
    }

    /// Returns the HTTP status code for synchronous (token endpoint) delivery.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient { .. } => 401,
            Self::AccessDenied { .. } => 403,
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::IdentityProvider { .. } => 500,
            _ => 400,
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } | Self::InvalidGrant { .. } | Self::LoginRequired => {
                ErrorCategory::Authentication
            }
            Self::InvalidScope { .. } | Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::InvalidRequest { .. }
            | Self::RedirectUriMismatch { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::IdentityProvider { .. } => ErrorCategory::Federation,
        }
    }
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication-related errors (identity verification).
    Authentication,
    /// Authorization-related errors (consent, scope checks).
    Authorization,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
    /// Identity provider errors.
    Federation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
            Self::Federation => write!(f, "federation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("Client authentication failed");
        assert_eq!(
            err.to_string(),
            "Invalid client: Client authentication failed"
        );

        let err = AuthError::invalid_grant("The authorization code abc is invalid.");
        assert_eq!(
            err.to_string(),
            "Invalid grant: The authorization code abc is invalid."
        );

        let err = AuthError::unsupported_grant_type("extension");
        assert_eq!(err.to_string(), "Unsupported grant type: extension");
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_request("x").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::redirect_uri_mismatch("x").oauth_error_code(),
            "redirect_uri_mismatch"
        );
        assert_eq!(AuthError::LoginRequired.oauth_error_code(), "login_required");
        assert_eq!(
            AuthError::storage("db down").oauth_error_code(),
            "server_error"
        );
    }

    #[test]
    fn test_error_description_exact_wire_strings() {
        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(err.error_description(), "Unsupported grant type: password");

        let err = AuthError::invalid_grant("Redirect URI mismatch.");
        assert_eq!(err.error_description(), "Redirect URI mismatch.");
    }

    #[test]
    fn test_server_errors_never_leak_details() {
        let err = AuthError::storage("connection string postgres://secret@db");
        assert_eq!(err.error_description(), "Internal server error");
        assert_eq!(err.http_status(), 500);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_client("x").http_status(), 401);
        assert_eq!(AuthError::invalid_grant("x").http_status(), 400);
        assert_eq!(AuthError::unsupported_grant_type("x").http_status(), 400);
        assert_eq!(AuthError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::invalid_scope("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            AuthError::redirect_uri_mismatch("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::identity_provider("ldap", "x").category(),
            ErrorCategory::Federation
        );
    }
}
