//! OAuth 2.0 / OIDC authorization flow components.

pub mod authorize;
pub mod client_auth;
pub mod flow;
pub mod pkce;
pub mod service;
pub mod token;

pub use authorize::{AuthorizationRequest, ResponseMode, ResponseType};
pub use client_auth::{AuthenticatedClient, authenticate_client, parse_basic_auth};
pub use flow::{AuthorizationCode, AuthorizationFlow, FlowStage, generate_code};
pub use pkce::{PkceChallenge, PkceChallengeMethod};
pub use service::{AuthorizationService, AuthorizeOutcome};
pub use token::{TokenErrorResponse, TokenRequest, TokenResponse};
