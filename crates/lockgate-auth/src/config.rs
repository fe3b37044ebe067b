//! Engine configuration.
//!
//! Deserialized from the gateway's configuration file; durations accept
//! humantime strings (`"10m"`, `"90d"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.example.com"
//! flow_lifetime = "10m"
//! refresh_token_rotation = true
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::oauth::service::AuthorizationConfig;
use crate::token::service::TokenServiceConfig;

/// Root configuration for the flow engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL stamped into the `iss` claim of every token.
    pub issuer: String,

    /// How long a login/consent round trip may take.
    #[serde(with = "humantime_serde")]
    pub flow_lifetime: Duration,

    /// Rotate refresh tokens on use. When enabled, each refresh revokes
    /// the presented token and issues a replacement.
    pub refresh_token_rotation: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            flow_lifetime: Duration::from_secs(600),
            refresh_token_rotation: true,
        }
    }
}

impl AuthConfig {
    /// Sets the issuer URL.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the flow lifetime.
    #[must_use]
    pub fn with_flow_lifetime(mut self, lifetime: Duration) -> Self {
        self.flow_lifetime = lifetime;
        self
    }

    /// Sets refresh token rotation.
    #[must_use]
    pub fn with_refresh_token_rotation(mut self, rotate: bool) -> Self {
        self.refresh_token_rotation = rotate;
        self
    }

    /// Configuration slice for the authorization request processor.
    #[must_use]
    pub fn authorization_config(&self) -> AuthorizationConfig {
        AuthorizationConfig::default().with_flow_lifetime(time::Duration::seconds(
            self.flow_lifetime.as_secs() as i64,
        ))
    }

    /// Configuration slice for the grant evaluator.
    #[must_use]
    pub fn token_service_config(&self) -> TokenServiceConfig {
        TokenServiceConfig::default().with_rotate_refresh_tokens(self.refresh_token_rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.flow_lifetime, Duration::from_secs(600));
        assert!(config.refresh_token_rotation);
    }

    #[test]
    fn test_humantime_durations() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"issuer":"https://auth.example.com","flow_lifetime":"5m"}"#,
        )
        .unwrap();
        assert_eq!(config.flow_lifetime, Duration::from_secs(300));
        assert_eq!(config.issuer, "https://auth.example.com");
    }

    #[test]
    fn test_config_slices() {
        let config = AuthConfig::default()
            .with_refresh_token_rotation(false)
            .with_flow_lifetime(Duration::from_secs(120));
        assert!(!config.token_service_config().rotate_refresh_tokens);
        assert_eq!(
            config.authorization_config().flow_lifetime,
            time::Duration::seconds(120)
        );
    }
}
