//! Authentication service - credential exchange and session lifecycle

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::wallet_api::{AuthGrant, WalletApiClient};
use crate::config::{IdentityPolicy, IdentitySource};
use crate::domain::result::Result;
use crate::domain::{AuthenticationRequest, Credentials, Session, UserIdentity};
use crate::ports::{IpResolver, SessionStore};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub session: Session,
    pub user: UserIdentity,
}

/// Serializable view of a login for JSON output
#[derive(Debug, Serialize)]
pub struct LoginSummary {
    pub email: String,
    pub role: String,
    pub server_verified: bool,
    pub session_fingerprint: String,
}

impl From<&AuthOutcome> for LoginSummary {
    fn from(outcome: &AuthOutcome) -> Self {
        Self {
            email: outcome.user.email.clone(),
            role: outcome.user.role.clone(),
            server_verified: outcome.user.server_verified,
            session_fingerprint: outcome.session.fingerprint(),
        }
    }
}

pub struct AuthService {
    client: Arc<WalletApiClient>,
    ip_resolver: Arc<dyn IpResolver>,
    session_store: Arc<dyn SessionStore>,
    identity: IdentityPolicy,
}

impl AuthService {
    pub fn new(
        client: Arc<WalletApiClient>,
        ip_resolver: Arc<dyn IpResolver>,
        session_store: Arc<dyn SessionStore>,
        identity: IdentityPolicy,
    ) -> Self {
        Self {
            client,
            ip_resolver,
            session_store,
            identity,
        }
    }

    /// Exchange credentials for a session and store it
    ///
    /// Order matters: credentials are checked before any network call, and the
    /// IP must resolve before the authentication request is built. A failed
    /// attempt leaves the session store as it was.
    pub async fn authenticate(&self, credentials: &Credentials, email: &str) -> Result<AuthOutcome> {
        credentials.validate()?;

        let ip_address = self.ip_resolver.resolve().await.map_err(|e| {
            warn!(error = %e, "IP lookup failed, authentication aborted");
            e
        })?;

        let request = AuthenticationRequest::new(credentials, ip_address);
        let grant = self.client.authenticate(&request).await.map_err(|e| {
            warn!(error = %e, "authentication failed");
            e
        })?;

        let user = self.identity_for(email, &grant);
        let session = grant.session;
        self.session_store.set(session.clone());

        info!(
            session = %session.fingerprint(),
            role = %user.role,
            server_verified = user.server_verified,
            "authenticated"
        );

        Ok(AuthOutcome { session, user })
    }

    /// Drop the current session
    pub fn logout(&self) {
        if self.session_store.has_session() {
            info!("session cleared");
        }
        self.session_store.clear();
    }

    /// Clear the current session, then authenticate again
    pub async fn reauthenticate(&self, credentials: &Credentials, email: &str) -> Result<AuthOutcome> {
        self.logout();
        self.authenticate(credentials, email).await
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session_store.get()
    }

    fn identity_for(&self, email: &str, grant: &AuthGrant) -> UserIdentity {
        let local = UserIdentity::local(email.trim(), self.identity.default_role.as_str());
        match self.identity.source {
            IdentitySource::Local => local,
            IdentitySource::Response => {
                let server_verified = grant.email.is_some() || grant.role.is_some();
                UserIdentity {
                    email: grant.email.clone().unwrap_or(local.email),
                    role: grant.role.clone().unwrap_or(local.role),
                    server_verified,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ip_lookup::{HttpIpResolver, StaticIpResolver};
    use crate::adapters::memory_session::InMemorySessionStore;
    use crate::adapters::mock_wallet::{MockConfig, MockWalletServer};
    use crate::domain::result::ErrorKind;

    struct Harness {
        server: MockWalletServer,
        store: Arc<InMemorySessionStore>,
        service: AuthService,
    }

    fn harness(config: MockConfig, identity: IdentityPolicy) -> Harness {
        let server = MockWalletServer::start(config).unwrap();
        let client = Arc::new(WalletApiClient::new(&server.base_url(), 5).unwrap());
        let resolver = Arc::new(HttpIpResolver::new(&server.ip_lookup_url(), 5).unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let service = AuthService::new(client, resolver, store.clone(), identity);
        Harness { server, store, service }
    }

    fn valid_credentials(h: &Harness) -> Credentials {
        Credentials::new(&h.server.config().api_key, &h.server.config().api_secret)
    }

    #[tokio::test]
    async fn test_authenticate_stores_session() {
        let h = harness(MockConfig::default(), IdentityPolicy::default());
        let outcome = h
            .service
            .authenticate(&valid_credentials(&h), "merchant@example.com")
            .await
            .unwrap();

        assert!(!outcome.session.token().is_empty());
        assert_eq!(h.store.get().unwrap(), outcome.session);
        assert_eq!(outcome.user, UserIdentity::local("merchant@example.com", "admin"));

        // IP lookup first, then the credential exchange
        let paths: Vec<String> = h.server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/ip".to_string(), "/auth/login".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_credentials_make_no_network_calls() {
        let h = harness(MockConfig::default(), IdentityPolicy::default());

        for (key, secret) in [("", "secret"), ("key", ""), ("", "")] {
            let err = h
                .service
                .authenticate(&Credentials::new(key, secret), "a@b.c")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
        }

        assert_eq!(h.server.request_count(), 0);
        assert!(h.store.get().is_none());
    }

    #[tokio::test]
    async fn test_ip_failure_aborts_before_login() {
        let h = harness(
            MockConfig {
                fail_ip_lookup: true,
                ..Default::default()
            },
            IdentityPolicy::default(),
        );

        let err = h
            .service
            .authenticate(&valid_credentials(&h), "a@b.c")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(h.server.requests_to("/auth/login").is_empty());
        assert!(h.store.get().is_none());
    }

    #[tokio::test]
    async fn test_rejected_credentials_keep_store_untouched() {
        let h = harness(MockConfig::default(), IdentityPolicy::default());
        let err = h
            .service
            .authenticate(&Credentials::new("wrong", "wrong"), "a@b.c")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(h.store.get().is_none());
    }

    #[tokio::test]
    async fn test_2xx_without_token_is_auth_error() {
        let h = harness(
            MockConfig {
                omit_session_id: true,
                ..Default::default()
            },
            IdentityPolicy::default(),
        );
        let err = h
            .service
            .authenticate(&valid_credentials(&h), "a@b.c")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(h.store.get().is_none());
    }

    #[tokio::test]
    async fn test_second_login_replaces_first() {
        let h = harness(MockConfig::default(), IdentityPolicy::default());
        let first = h.service.authenticate(&valid_credentials(&h), "a@b.c").await.unwrap();
        let second = h.service.authenticate(&valid_credentials(&h), "a@b.c").await.unwrap();

        assert_ne!(first.session.token(), second.session.token());
        assert_eq!(h.store.get().unwrap().token(), second.session.token());
    }

    #[tokio::test]
    async fn test_logout_and_reauthenticate() {
        let h = harness(MockConfig::default(), IdentityPolicy::default());
        let first = h.service.authenticate(&valid_credentials(&h), "a@b.c").await.unwrap();

        h.service.logout();
        assert!(h.service.current_session().is_none());

        let again = h
            .service
            .reauthenticate(&valid_credentials(&h), "a@b.c")
            .await
            .unwrap();
        assert_ne!(again.session.token(), first.session.token());
        assert!(h.service.current_session().is_some());
    }

    #[tokio::test]
    async fn test_identity_from_response() {
        let policy = IdentityPolicy {
            source: IdentitySource::Response,
            default_role: "viewer".to_string(),
        };
        let h = harness(
            MockConfig {
                identity_in_response: true,
                ..Default::default()
            },
            policy.clone(),
        );
        let outcome = h.service.authenticate(&valid_credentials(&h), "typed@example.com").await.unwrap();
        assert_eq!(outcome.user.email, "merchant@example.com");
        assert_eq!(outcome.user.role, "merchant");
        assert!(outcome.user.server_verified);

        // Falls back to local values when the server sends none
        let h = harness(MockConfig::default(), policy);
        let outcome = h.service.authenticate(&valid_credentials(&h), "typed@example.com").await.unwrap();
        assert_eq!(outcome.user.email, "typed@example.com");
        assert_eq!(outcome.user.role, "viewer");
        assert!(!outcome.user.server_verified);
    }

    #[tokio::test]
    async fn test_static_resolver_skips_lookup() {
        let server = MockWalletServer::start(MockConfig::default()).unwrap();
        let client = Arc::new(WalletApiClient::new(&server.base_url(), 5).unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let service = AuthService::new(
            client,
            Arc::new(StaticIpResolver::new("198.51.100.4")),
            store,
            IdentityPolicy::default(),
        );
        let credentials = Credentials::new(&server.config().api_key, &server.config().api_secret);
        service.authenticate(&credentials, "a@b.c").await.unwrap();

        assert!(server.requests_to("/ip").is_empty());
        let body: serde_json::Value =
            serde_json::from_str(&server.requests_to("/auth/login")[0].body).unwrap();
        assert_eq!(body["extraData"]["ipAddress"], "198.51.100.4");
    }
}
