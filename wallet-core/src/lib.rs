//! Wallet Core - client-side session manager for the merchant wallet API
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Credentials, sessions, balances, transactions and the response normalizer
//! - **ports**: Trait definitions for external dependencies (IpResolver, SessionStore)
//! - **services**: Authentication, balance and history orchestration
//! - **adapters**: Concrete implementations (reqwest clients, in-memory store, mock server)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::sync::Arc;

use chrono::NaiveDateTime;

use adapters::ip_lookup::{HttpIpResolver, StaticIpResolver};
use adapters::memory_session::InMemorySessionStore;
use adapters::wallet_api::WalletApiClient;
use config::Config;
use ports::{IpResolver, SessionStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult, Result};
pub use domain::{
    BalanceDisplay, BalanceSnapshot, Credentials, PageCursor, Session, TransactionPage,
    TransactionQuery, TransactionRecord, UserIdentity,
};
pub use services::{AuthOutcome, HistoryView, LoginSummary};

/// Balance and first history page, fetched together
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub balance: BalanceDisplay,
    pub history: Result<HistoryView>,
}

/// Main context for wallet operations
///
/// Holds one session store shared by every service. Build one per client
/// process; the session lives as long as the context.
pub struct WalletContext {
    pub config: Config,
    pub session_store: Arc<dyn SessionStore>,
    pub auth_service: AuthService,
    pub balance_service: BalanceService,
    pub history_service: HistoryService,
}

impl WalletContext {
    /// Create a context with HTTP IP lookup (or the configured address) and
    /// an empty in-memory session store
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let ip_resolver: Arc<dyn IpResolver> = match &config.public_ip {
            Some(ip) => Arc::new(StaticIpResolver::new(ip.trim())),
            None => Arc::new(HttpIpResolver::new(&config.ip_lookup_url, config.timeout_secs)?),
        };
        Self::with_parts(config, ip_resolver, Arc::new(InMemorySessionStore::new()))
    }

    /// Create a context from explicit collaborators
    pub fn with_parts(
        config: Config,
        ip_resolver: Arc<dyn IpResolver>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let client = Arc::new(WalletApiClient::with_endpoints(
            &config.base_url,
            config.endpoints.clone(),
            config.timeout_secs,
        )?);

        let auth_service = AuthService::new(
            Arc::clone(&client),
            ip_resolver,
            Arc::clone(&session_store),
            config.identity.clone(),
        );
        let balance_service = BalanceService::new(Arc::clone(&client), Arc::clone(&session_store));
        let history_service =
            HistoryService::new(Arc::clone(&client), Arc::clone(&session_store), config.batch_size);

        Ok(Self {
            config,
            session_store,
            auth_service,
            balance_service,
            history_service,
        })
    }

    /// Authenticate with the configured credentials
    pub async fn login(&self, email: &str) -> Result<AuthOutcome> {
        let credentials = self.config.credentials()?;
        self.auth_service.authenticate(&credentials, email).await
    }

    /// Drop the session and start over with the configured credentials
    pub async fn relogin(&self, email: &str) -> Result<AuthOutcome> {
        let credentials = self.config.credentials()?;
        self.history_service.reset();
        self.auth_service.reauthenticate(&credentials, email).await
    }

    pub fn logout(&self) {
        self.history_service.reset();
        self.auth_service.logout();
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_store.has_session()
    }

    /// Fetch the balance and the first page for a range concurrently.
    /// Either may fail without affecting the other.
    pub async fn load_dashboard(&self, start: NaiveDateTime, end: NaiveDateTime) -> DashboardSnapshot {
        let (balance, history) = tokio::join!(
            self.balance_service.fetch_balance(),
            self.history_service.search(start, end)
        );
        DashboardSnapshot {
            balance: BalanceDisplay::from_result(&balance),
            history,
        }
    }

    /// Re-fetch the balance and the current history page concurrently
    pub async fn refresh_dashboard(&self) -> DashboardSnapshot {
        let (balance, history) = tokio::join!(
            self.balance_service.fetch_balance(),
            self.history_service.refresh()
        );
        DashboardSnapshot {
            balance: BalanceDisplay::from_result(&balance),
            history,
        }
    }
}
