//! DashMap-backed storage implementations.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use lockgate_auth::AuthResult;
use lockgate_auth::error::AuthError;
use lockgate_auth::oauth::flow::{AuthorizationCode, AuthorizationFlow};
use lockgate_auth::storage::{
    ApprovalStorage, ClientStorage, CodeStorage, DomainStorage, FlowStorage, RefreshTokenStorage,
    ScopeApproval, SessionStorage, UserStorage,
};
use lockgate_auth::types::{Client, Domain, EndUserSession, RefreshToken, User};

// =============================================================================
// Clients
// =============================================================================

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct MemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl MemoryClientStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the
    /// client_id is already taken.
    pub fn register(&self, client: Client) -> AuthResult<()> {
        client
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        if self.clients.contains_key(&client.client_id) {
            return Err(AuthError::configuration(format!(
                "Client {} already registered",
                client.client_id
            )));
        }
        self.clients.insert(client.client_id.clone(), client);
        Ok(())
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.clone()))
    }

    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
        Ok(self
            .clients
            .get(client_id)
            .is_some_and(|c| c.valid_secrets().any(|s| s.secret == secret)))
    }
}

// =============================================================================
// Domains
// =============================================================================

/// In-memory domain registry.
#[derive(Debug, Default)]
pub struct MemoryDomainStorage {
    domains: DashMap<String, Domain>,
}

impl MemoryDomainStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a domain.
    pub fn register(&self, domain: Domain) {
        self.domains.insert(domain.id.clone(), domain);
    }
}

#[async_trait]
impl DomainStorage for MemoryDomainStorage {
    async fn find_by_id(&self, domain_id: &str) -> AuthResult<Option<Domain>> {
        Ok(self.domains.get(domain_id).map(|d| d.clone()))
    }
}

// =============================================================================
// Authorization codes
// =============================================================================

/// In-memory authorization code store.
#[derive(Debug, Default)]
pub struct MemoryCodeStorage {
    codes: DashMap<String, AuthorizationCode>,
}

impl MemoryCodeStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStorage for MemoryCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        // remove() is the whole point: lookup and delete in one atomic
        // step, so concurrent redemptions get exactly one winner.
        Ok(self.codes.remove(code).map(|(_, v)| v))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired());
        Ok((before - self.codes.len()) as u64)
    }
}

// =============================================================================
// Flows
// =============================================================================

/// In-memory flow store.
#[derive(Debug, Default)]
pub struct MemoryFlowStorage {
    flows: DashMap<Uuid, AuthorizationFlow>,
}

impl MemoryFlowStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStorage for MemoryFlowStorage {
    async fn create(&self, flow: &AuthorizationFlow) -> AuthResult<()> {
        self.flows.insert(flow.id, flow.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<AuthorizationFlow>> {
        Ok(self.flows.get(&id).map(|f| f.clone()))
    }

    async fn update(&self, flow: &AuthorizationFlow) -> AuthResult<()> {
        self.flows.insert(flow.id, flow.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.flows.remove(&id);
        Ok(())
    }
}

// =============================================================================
// Scope approvals
// =============================================================================

/// In-memory approval store, keyed by user and client.
#[derive(Debug, Default)]
pub struct MemoryApprovalStorage {
    approvals: DashMap<(String, String), Vec<ScopeApproval>>,
}

impl MemoryApprovalStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStorage for MemoryApprovalStorage {
    async fn save(&self, approval: &ScopeApproval) -> AuthResult<()> {
        let key = (approval.user_id.clone(), approval.client_id.clone());
        let mut entry = self.approvals.entry(key).or_default();
        entry.retain(|a| a.scope != approval.scope);
        entry.push(approval.clone());
        Ok(())
    }

    async fn find(&self, user_id: &str, client_id: &str) -> AuthResult<Vec<ScopeApproval>> {
        Ok(self
            .approvals
            .get(&(user_id.to_string(), client_id.to_string()))
            .map(|a| a.clone())
            .unwrap_or_default())
    }

    async fn revoke(&self, user_id: &str, client_id: &str) -> AuthResult<()> {
        self.approvals
            .remove(&(user_id.to_string(), client_id.to_string()));
        Ok(())
    }

    async fn purge_expired(&self) -> AuthResult<u64> {
        let mut removed = 0u64;
        for mut entry in self.approvals.iter_mut() {
            let before = entry.len();
            entry.retain(ScopeApproval::is_active);
            removed += (before - entry.len()) as u64;
        }
        Ok(removed)
    }
}

// =============================================================================
// Refresh tokens
// =============================================================================

/// In-memory refresh token store, keyed by token hash.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: DashMap<String, RefreshToken>,
}

impl MemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token_hash).map(|t| t.clone()))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<()> {
        if let Some(mut token) = self.tokens.get_mut(token_hash) {
            if token.revoked_at.is_none() {
                token.revoked_at = Some(OffsetDateTime::now_utc());
            }
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| token.is_valid());
        Ok((before - self.tokens.len()) as u64)
    }
}

// =============================================================================
// Users
// =============================================================================

/// In-memory identity provider.
///
/// Stores credentials in plain text; it exists for tests and demos,
/// not for production identity.
#[derive(Debug, Default)]
pub struct MemoryUserStorage {
    users: DashMap<String, (User, String)>,
}

impl MemoryUserStorage {
    /// Creates an empty identity store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user with the given password.
    pub fn add_user(&self, user: User, password: impl Into<String>) {
        self.users
            .insert(user.id.clone(), (user, password.into()));
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn authenticate(
        &self,
        domain_id: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<User>> {
        Ok(self.users.iter().find_map(|entry| {
            let (user, stored_password) = entry.value();
            (user.domain_id == domain_id
                && user.username == username
                && user.enabled
                && stored_password == password)
                .then(|| user.clone())
        }))
    }

    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(user_id).map(|entry| entry.0.clone()))
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// In-memory session store, keyed by session token.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: DashMap<String, EndUserSession>,
}

impl MemorySessionStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create(&self, session: &EndUserSession) -> AuthResult<()> {
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<EndUserSession>> {
        Ok(self.sessions.get(token).map(|s| s.clone()))
    }

    async fn delete(&self, token: &str) -> AuthResult<()> {
        self.sessions.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_code(value: &str) -> AuthorizationCode {
        AuthorizationCode {
            code: value.to_string(),
            client_id: "client-1".to_string(),
            redirect_uri: "http://localhost:4000/".to_string(),
            scopes: vec!["openid".to_string()],
            subject: "user-1".to_string(),
            pkce: None,
            nonce: None,
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(1),
        }
    }

    #[tokio::test]
    async fn test_code_consume_is_single_use() {
        let storage = MemoryCodeStorage::new();
        storage.create(&make_code("abc")).await.unwrap();

        assert!(storage.consume("abc").await.unwrap().is_some());
        assert!(storage.consume("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_cleanup_expired() {
        let storage = MemoryCodeStorage::new();
        let mut expired = make_code("old");
        expired.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        storage.create(&expired).await.unwrap();
        storage.create(&make_code("fresh")).await.unwrap();

        assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
        assert!(storage.consume("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_approval_save_replaces_same_scope() {
        let storage = MemoryApprovalStorage::new();
        let mut approval = ScopeApproval {
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            domain_id: "domain-1".to_string(),
            scope: "scope1".to_string(),
            granted_at: OffsetDateTime::now_utc(),
            expires_at: Some(OffsetDateTime::now_utc() - Duration::seconds(1)),
        };
        storage.save(&approval).await.unwrap();

        // Re-consent replaces the lapsed approval.
        approval.expires_at = Some(OffsetDateTime::now_utc() + Duration::hours(1));
        storage.save(&approval).await.unwrap();

        let found = storage.find("user-1", "client-1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_active());
    }

    #[tokio::test]
    async fn test_client_registration_validates() {
        use lockgate_auth::types::{ApplicationType, GrantType};

        let storage = MemoryClientStorage::new();
        let client = Client {
            client_id: "svc".to_string(),
            name: "Service".to_string(),
            domain_id: "domain-1".to_string(),
            application_type: ApplicationType::Service,
            secrets: vec![],
            grant_types: vec![GrantType::ClientCredentials],
            redirect_uris: vec![],
            token_endpoint_auth_methods: vec![],
            scope_settings: vec![],
            force_pkce: false,
            force_s256_code_challenge_method: false,
            confidential: true,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            id_token_custom_claims: Default::default(),
            jwks: None,
            jwks_uri: None,
        };
        // Confidential client without a secret is rejected.
        assert!(storage.register(client).is_err());
    }

    #[tokio::test]
    async fn test_refresh_revoke_idempotent() {
        let storage = MemoryRefreshTokenStorage::new();
        let token = RefreshToken {
            token_hash: "hash-1".to_string(),
            client_id: "client-1".to_string(),
            subject: None,
            scopes: vec![],
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
            revoked_at: None,
        };
        storage.create(&token).await.unwrap();

        storage.revoke("hash-1").await.unwrap();
        let first = storage.find_by_hash("hash-1").await.unwrap().unwrap();
        storage.revoke("hash-1").await.unwrap();
        let second = storage.find_by_hash("hash-1").await.unwrap().unwrap();
        assert_eq!(first.revoked_at, second.revoked_at);
    }
}
