//! End-user identity types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An end user known to a domain's identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier within the domain.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Owning domain.
    pub domain_id: String,

    /// Display name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Email address, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the account can authenticate.
    pub enabled: bool,
}

/// An authenticated end-user session at the gateway.
///
/// Created by a successful login and threaded through subsequent
/// authorization flows so the user is not re-prompted. The session
/// token is the opaque value carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndUserSession {
    /// Opaque session token.
    pub token: String,

    /// Authenticated subject (user id).
    pub subject: String,

    /// Owning domain.
    pub domain_id: String,

    /// When the session was established.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl EndUserSession {
    /// Returns `true` if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if the session can authenticate flows.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}
