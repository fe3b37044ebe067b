//! Refresh token record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored refresh token.
///
/// Only the SHA-256 hash of the token value is persisted; the raw value
/// leaves the issuer exactly once, in the token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// SHA-256 hash of the token value, base64url encoded.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Subject (user id) the token is bound to, absent for
    /// client-only grants that were upgraded through refresh.
    pub subject: Option<String>,

    /// Scopes granted to the original token.
    pub scopes: Vec<String>,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked, if it was.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token can still be redeemed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_token(expires_in: Duration) -> RefreshToken {
        RefreshToken {
            token_hash: "hash".to_string(),
            client_id: "client-1".to_string(),
            subject: Some("user-1".to_string()),
            scopes: vec!["openid".to_string()],
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc() + expires_in,
            revoked_at: None,
        }
    }

    #[test]
    fn test_validity() {
        assert!(make_token(Duration::hours(1)).is_valid());
        assert!(!make_token(Duration::hours(-1)).is_valid());
    }

    #[test]
    fn test_revoked() {
        let mut token = make_token(Duration::hours(1));
        token.revoked_at = Some(OffsetDateTime::now_utc());
        assert!(!token.is_valid());
        assert!(token.is_revoked());
        assert!(!token.is_expired());
    }
}
