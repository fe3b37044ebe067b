//! Core domain types.

pub mod client;
pub mod domain;
pub mod refresh_token;
pub mod user;

pub use client::{
    ApplicationType, Client, ClientSecret, ClientValidationError, GrantType, ScopeSetting,
    TokenEndpointAuthMethod,
};
pub use domain::Domain;
pub use refresh_token::RefreshToken;
pub use user::{EndUserSession, User};
