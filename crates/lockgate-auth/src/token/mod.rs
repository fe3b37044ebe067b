//! Token minting and grant evaluation.

pub mod issuer;
pub mod jwt;
pub mod service;

pub use issuer::{IssuanceRequest, TokenIssuer, hash_refresh_token};
pub use jwt::{AccessTokenClaims, IdTokenClaims, JwtService, KeyProvider};
pub use service::{GrantOutcome, TokenService, TokenServiceConfig};
