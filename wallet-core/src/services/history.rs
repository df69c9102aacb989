//! History service - filtered, paginated transaction list
//!
//! Each load takes a new generation number. A response is published to the
//! view only while its generation is still the latest; an older in-flight
//! request is dropped as soon as a newer one starts.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapters::wallet_api::WalletApiClient;
use crate::domain::result::{Error, ErrorKind, Result};
use crate::domain::{PageCursor, TransactionPage, TransactionQuery, TransactionRecord};
use crate::ports::SessionStore;

/// What the dashboard shows for history
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub page: u32,
    #[serde(skip)]
    pub query: Option<TransactionQuery>,
    pub records: Vec<TransactionRecord>,
    /// Raw XML shown in place of the list when the server answered with XML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<ErrorKind>,
    pub last_page_reached: bool,
    pub generation: u64,
}

impl HistoryView {
    pub fn result_count(&self) -> usize {
        self.records.len()
    }

    pub fn can_go_back(&self) -> bool {
        PageCursor::new(self.page).can_go_back()
    }

    /// Next stays available until a page comes back empty
    pub fn can_go_forward(&self) -> bool {
        self.query.is_some() && !self.records.is_empty()
    }

    fn publish(&mut self, query: TransactionQuery, page: TransactionPage) {
        self.page = query.page;
        self.query = Some(query);
        self.last_page_reached = page.is_last_page();
        self.records = page.records;
        self.raw_xml = page.raw_xml;
        self.last_error = None;
        self.last_error_kind = None;
    }

    fn publish_error(&mut self, query: TransactionQuery, error: &Error) {
        self.page = query.page;
        self.query = Some(query);
        self.records.clear();
        self.raw_xml = None;
        self.last_error = Some(error.to_string());
        self.last_error_kind = Some(error.kind());
        self.last_page_reached = false;
    }
}

/// The published view plus the query of the latest load, which may still be
/// in flight
#[derive(Debug, Default)]
struct HistoryState {
    view: HistoryView,
    requested: Option<TransactionQuery>,
}

pub struct HistoryService {
    client: Arc<WalletApiClient>,
    session_store: Arc<dyn SessionStore>,
    batch_size: u32,
    state: Mutex<HistoryState>,
    generation: watch::Sender<u64>,
}

impl HistoryService {
    pub fn new(client: Arc<WalletApiClient>, session_store: Arc<dyn SessionStore>, batch_size: u32) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            client,
            session_store,
            batch_size,
            state: Mutex::new(HistoryState {
                view: HistoryView {
                    page: 1,
                    ..Default::default()
                },
                requested: None,
            }),
            generation,
        }
    }

    /// Fetch one page without touching the view
    pub async fn fetch_history(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let session = self.session_store.get().ok_or(Error::NoSession)?;
        let page = self.client.get_history(&session, query).await?;
        debug!(
            session = %session.fingerprint(),
            page = page.page,
            results = page.result_count(),
            degraded = page.is_degraded(),
            "history page fetched"
        );
        Ok(page)
    }

    /// New date range, back to page 1
    pub async fn search(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<HistoryView> {
        let query = TransactionQuery::new(start, end, 1, self.batch_size)?;
        self.load(query).await
    }

    /// Advance one page. The total is unknown, so this always issues a request.
    pub async fn next(&self) -> Result<HistoryView> {
        let query = self.current_query()?;
        let mut cursor = PageCursor::new(query.page);
        let page = cursor.next();
        self.load(query.with_page(page)).await
    }

    /// Step back one page, never below page 1
    pub async fn previous(&self) -> Result<HistoryView> {
        let query = self.current_query()?;
        let mut cursor = PageCursor::new(query.page);
        let page = cursor.previous();
        self.load(query.with_page(page)).await
    }

    /// Re-issue the current query
    pub async fn refresh(&self) -> Result<HistoryView> {
        let query = self.current_query()?;
        self.load(query).await
    }

    /// Snapshot of the current view
    pub fn view(&self) -> HistoryView {
        self.lock_state().view.clone()
    }

    /// Forget the range and results; in-flight loads are superseded
    pub fn reset(&self) {
        let mut state = self.lock_state();
        let mut generation = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        *state = HistoryState {
            view: HistoryView {
                page: 1,
                generation,
                ..Default::default()
            },
            requested: None,
        };
    }

    /// Load a page into the view
    ///
    /// The view keeps showing the previous page until this load finishes.
    /// Returns `Error::Cancelled` when a newer load started before this one
    /// finished; the view then belongs to the newer load.
    pub async fn load(&self, query: TransactionQuery) -> Result<HistoryView> {
        let session = self.session_store.get().ok_or(Error::NoSession)?;

        let generation = {
            let mut state = self.lock_state();
            let mut generation = 0;
            self.generation.send_modify(|g| {
                *g += 1;
                generation = *g;
            });
            state.requested = Some(query.clone());
            generation
        };
        let mut superseded = self.generation.subscribe();

        let result = tokio::select! {
            result = self.client.get_history(&session, &query) => result,
            _ = wait_superseded(&mut superseded, generation) => {
                debug!(generation, page = query.page, "history load superseded");
                return Err(Error::Cancelled);
            }
        };

        let mut state = self.lock_state();
        if *self.generation.borrow() != generation {
            debug!(generation, page = query.page, "dropping stale history response");
            return Err(Error::Cancelled);
        }
        let view = &mut state.view;
        view.generation = generation;

        match result {
            Ok(page) => {
                info!(
                    page = page.page,
                    results = page.result_count(),
                    degraded = page.is_degraded(),
                    "history loaded"
                );
                view.publish(query, page);
                Ok(view.clone())
            }
            Err(e) => {
                warn!(page = query.page, error = %e, "history load failed");
                view.publish_error(query, &e);
                Err(e)
            }
        }
    }

    fn current_query(&self) -> Result<TransactionQuery> {
        self.lock_state()
            .requested
            .clone()
            .ok_or_else(|| Error::validation("no date range selected"))
    }

    fn lock_state(&self) -> MutexGuard<'_, HistoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Resolves once the latest generation differs from `generation`
async fn wait_superseded(rx: &mut watch::Receiver<u64>, generation: u64) {
    loop {
        if *rx.borrow_and_update() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
