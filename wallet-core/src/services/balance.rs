//! Balance service

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapters::wallet_api::WalletApiClient;
use crate::domain::result::{Error, Result};
use crate::domain::{BalanceSnapshot, Session};
use crate::ports::SessionStore;

pub struct BalanceService {
    client: Arc<WalletApiClient>,
    session_store: Arc<dyn SessionStore>,
}

impl BalanceService {
    pub fn new(client: Arc<WalletApiClient>, session_store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            session_store,
        }
    }

    /// Fetch the ledger balance for the stored session
    ///
    /// No request goes out without a session.
    pub async fn fetch_balance(&self) -> Result<BalanceSnapshot> {
        let session = self.session_store.get().ok_or(Error::NoSession)?;
        self.fetch_balance_for(&session).await
    }

    pub async fn fetch_balance_for(&self, session: &Session) -> Result<BalanceSnapshot> {
        match self.client.get_balance(session).await {
            Ok(snapshot) => {
                debug!(session = %session.fingerprint(), "balance fetched");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(session = %session.fingerprint(), error = %e, "balance fetch failed");
                Err(e)
            }
        }
    }
}
