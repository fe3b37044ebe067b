//! Audit event sink.
//!
//! The engine emits an event for every security-relevant outcome. The
//! sink is write-only; querying the trail belongs to the management
//! plane.

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;

/// A security-relevant event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A client authenticated at the token endpoint.
    ClientAuthenticated {
        /// The authenticated client.
        client_id: String,
        /// Authentication method used.
        auth_method: String,
    },
    /// Client authentication failed.
    ClientAuthenticationFailed {
        /// The client_id presented, when one was.
        client_id: Option<String>,
    },
    /// An end user logged in.
    UserLoggedIn {
        /// The authenticated subject.
        subject: String,
        /// The client whose flow triggered the login.
        client_id: String,
    },
    /// An end-user login attempt failed.
    UserLoginFailed {
        /// The username presented.
        username: String,
        /// The client whose flow triggered the login.
        client_id: String,
    },
    /// The user approved or denied consent.
    ConsentDecision {
        /// The deciding subject.
        subject: String,
        /// The client scopes were granted to.
        client_id: String,
        /// Whether consent was granted.
        approved: bool,
        /// The scopes the decision covered.
        scopes: Vec<String>,
    },
    /// Tokens were issued.
    TokensIssued {
        /// The receiving client.
        client_id: String,
        /// The subject, absent for machine tokens.
        subject: Option<String>,
        /// The grant that produced the tokens.
        grant_type: String,
        /// Granted scopes.
        scopes: Vec<String>,
    },
    /// A grant was rejected.
    GrantRejected {
        /// The requesting client, when identified.
        client_id: Option<String>,
        /// OAuth error code of the rejection.
        error: String,
    },
}

/// Write-only destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event. Implementations must not fail the calling flow;
    /// delivery problems are their own concern.
    async fn record(&self, domain_id: &str, at: OffsetDateTime, event: AuditEvent);
}

/// Sink that emits events as structured tracing records.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, domain_id: &str, at: OffsetDateTime, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(target: "lockgate::audit", domain_id, %at, %payload, "audit event");
            }
            Err(e) => {
                tracing::warn!(target: "lockgate::audit", domain_id, error = %e, "unserializable audit event");
            }
        }
    }
}

/// Sink that drops every event. Useful in tests.
#[derive(Debug, Default, Clone)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _domain_id: &str, _at: OffsetDateTime, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::TokensIssued {
            client_id: "client-1".to_string(),
            subject: None,
            grant_type: "client_credentials".to_string(),
            scopes: vec!["scope1".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tokens_issued");
        assert_eq!(json["client_id"], "client-1");
        assert!(json["subject"].is_null());
    }

    #[tokio::test]
    async fn test_noop_sink() {
        NoopAuditSink
            .record(
                "domain-1",
                OffsetDateTime::now_utc(),
                AuditEvent::ClientAuthenticationFailed { client_id: None },
            )
            .await;
    }
}
