//! Security domain (tenant) configuration.

use serde::{Deserialize, Serialize};

/// A security domain: the tenant boundary every flow runs inside.
///
/// Clients, users, approvals and sessions all belong to exactly one
/// domain. The engine reads domain settings at flow-evaluation time;
/// provisioning happens through the management plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    /// Unique domain identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Whether the domain is enabled. Disabled domains reject every flow.
    pub enabled: bool,

    /// When `true`, redirect URIs must match a registered URI byte for
    /// byte. When `false`, a prefix match on the registered URI suffices.
    #[serde(default)]
    pub redirect_uri_strict_matching: bool,

    /// Default access token lifetime in seconds for clients without an
    /// override.
    pub access_token_lifetime: i64,

    /// Default refresh token lifetime in seconds for clients without an
    /// override.
    pub refresh_token_lifetime: i64,

    /// Authorization code lifetime in seconds.
    pub authorization_code_lifetime: i64,

    /// End-user session lifetime in seconds.
    pub session_lifetime: i64,

    /// Path of the gateway login page, relative to the domain root.
    pub login_path: String,

    /// Path of the gateway consent page, relative to the domain root.
    pub consent_path: String,

    /// Path of the gateway-local error page, relative to the domain root.
    pub error_path: String,
}

impl Domain {
    /// Creates a domain with the default gateway paths and lifetimes.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            redirect_uri_strict_matching: false,
            access_token_lifetime: 7200,
            refresh_token_lifetime: 14400,
            authorization_code_lifetime: 60,
            session_lifetime: 1800,
            login_path: "/login".to_string(),
            consent_path: "/oauth/consent".to_string(),
            error_path: "/oauth/error".to_string(),
        }
    }

    /// Enables strict redirect URI matching.
    #[must_use]
    pub fn with_strict_redirect_matching(mut self, strict: bool) -> Self {
        self.redirect_uri_strict_matching = strict;
        self
    }
}
