//! Scope approval storage trait.
//!
//! An approval records that a user granted a scope to a client. Each
//! approval expires independently according to the scope's configured
//! lifetime, which is what forces re-consent for short-lived scopes
//! while long-lived grants stay silent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;

/// A user's approval of one scope for one client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeApproval {
    /// The approving user.
    pub user_id: String,

    /// The client the scope was granted to.
    pub client_id: String,

    /// Owning domain.
    pub domain_id: String,

    /// The approved scope.
    pub scope: String,

    /// When the approval was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub granted_at: OffsetDateTime,

    /// When the approval lapses. `None` means it never does.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl ScopeApproval {
    /// Returns `true` if the approval still stands.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.expires_at
            .is_none_or(|exp| OffsetDateTime::now_utc() < exp)
    }
}

/// Storage operations for scope approvals.
#[async_trait]
pub trait ApprovalStorage: Send + Sync {
    /// Record an approval, replacing any previous approval of the same
    /// scope by the same user for the same client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, approval: &ScopeApproval) -> AuthResult<()>;

    /// Find all approvals a user has granted to a client, including
    /// expired ones. Callers filter with [`ScopeApproval::is_active`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, user_id: &str, client_id: &str) -> AuthResult<Vec<ScopeApproval>>;

    /// Revoke every approval a user has granted to a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, user_id: &str, client_id: &str) -> AuthResult<()>;

    /// Remove lapsed approvals. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn purge_expired(&self) -> AuthResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_approval_expiry() {
        let mut approval = ScopeApproval {
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            domain_id: "domain-1".to_string(),
            scope: "scope1".to_string(),
            granted_at: OffsetDateTime::now_utc(),
            expires_at: None,
        };
        assert!(approval.is_active());

        approval.expires_at = Some(OffsetDateTime::now_utc() - Duration::seconds(1));
        assert!(!approval.is_active());
    }
}
