//! OAuth 2.0 / OIDC authorization server flow engine.
//!
//! Lockgate evaluates authorization flows for multi-tenant security
//! domains: authorization code (with PKCE), implicit, client
//! credentials, resource owner password and refresh token grants, with
//! login/consent round trips, per-scope expiring approvals and
//! single-use authorization codes.
//!
//! The engine is split into four cooperating parts:
//!
//! - [`oauth::client_auth`] authenticates clients at the token endpoint
//! - [`oauth::service`] drives authorization requests through
//!   validation, login, consent and issuance
//! - [`token::service`] evaluates token endpoint grants
//! - [`token::issuer`] mints the actual tokens and normalizes scopes
//!
//! Storage is pluggable through the traits in [`storage`]; an
//! in-memory backend lives in the `lockgate-auth-memory` crate.

pub mod audit;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory};

/// Convenience result type for engine operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Commonly used types.
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
    pub use crate::config::AuthConfig;
    pub use crate::error::AuthError;
    pub use crate::http::{GatewayState, router};
    pub use crate::oauth::service::{
        AuthorizationConfig, AuthorizationService, AuthorizeOutcome,
    };
    pub use crate::oauth::token::{TokenRequest, TokenResponse};
    pub use crate::storage::{
        ApprovalStorage, ClientStorage, CodeStorage, DomainStorage, FlowStorage,
        RefreshTokenStorage, ScopeApproval, SessionStorage, UserStorage,
    };
    pub use crate::token::issuer::TokenIssuer;
    pub use crate::token::jwt::{JwtService, KeyProvider};
    pub use crate::token::service::{GrantOutcome, TokenService, TokenServiceConfig};
    pub use crate::types::{
        ApplicationType, Client, ClientSecret, Domain, EndUserSession, GrantType, ScopeSetting,
        TokenEndpointAuthMethod, User,
    };
    pub use crate::AuthResult;
}
