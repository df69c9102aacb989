//! Merchant wallet API client
//!
//! Handles communication with the remote wallet API: credential exchange,
//! ledger balance, and paginated transaction history.
//!
//! Every payload is wrapped in an `entity` envelope. History is the odd one
//! out: its filter and paging parameters travel as request headers with an
//! empty body, and the server may answer with XML instead of JSON.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::normalize::server_message;
use crate::domain::result::{Error, Result};
use crate::domain::{
    AuthenticationRequest, BalanceSnapshot, HistoryPayload, Session, TransactionPage,
    TransactionQuery,
};

/// Header carrying the session token on authenticated calls
pub const SESSION_HEADER: &str = "sessionId";

const JSON_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    entity: Option<AuthEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthEntity {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    session_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    entity: BalanceEntity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceEntity {
    #[serde(deserialize_with = "deserialize_amount")]
    ledger_balance: Decimal,
}

/// Deserialize optional ID that can be number or string
fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize amount that can be number or string
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s,
        _ => return Err(D::Error::custom("expected number or string for amount")),
    };
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e)))
}

/// Successful credential exchange
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub session: Session,
    /// Identity fields the server volunteered, if any
    pub email: Option<String>,
    pub role: Option<String>,
}

// =============================================================================
// Wallet HTTP Client
// =============================================================================

/// Default API base URL
pub const DEFAULT_BASE_URL: &str =
    "https://dev.tellerpoint.hextremelabs.com/Tellerpoint/rpc/merchant/external";

/// Endpoint paths, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth: String,
    pub balance: String,
    pub history: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: "/auth/login".to_string(),
            balance: "/wallet/balance".to_string(),
            history: "/history".to_string(),
        }
    }
}

/// Wallet API client
#[derive(Debug, Clone)]
pub struct WalletApiClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
    timeout_secs: u64,
}

impl WalletApiClient {
    /// Create a client for `base_url` with default endpoint paths
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Self::with_endpoints(base_url, Endpoints::default(), timeout_secs)
    }

    pub fn with_endpoints(base_url: &str, endpoints: Endpoints, timeout_secs: u64) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config("API base URL must use http or https"));
        }
        if timeout_secs == 0 {
            return Err(Error::config("Request timeout must be at least one second"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a session token
    ///
    /// Non-2xx answers are terminal authentication failures carrying the
    /// server's message when one is present. A 2xx answer without
    /// `entity.sessionId` is treated as a failure too.
    pub async fn authenticate(&self, request: &AuthenticationRequest) -> Result<AuthGrant> {
        let response = self
            .client
            .post(self.url(&self.endpoints.auth))
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<JsonValue>(&body)
                .ok()
                .as_ref()
                .and_then(server_message)
                .unwrap_or_else(|| format!("server rejected credentials (HTTP {})", status.as_u16()));
            return Err(Error::auth(message));
        }

        let parsed: AuthResponse = serde_json::from_str(&body)
            .map_err(|_| Error::auth("missing session token"))?;
        let entity = parsed.entity.ok_or_else(|| Error::auth("missing session token"))?;
        let token = entity
            .session_id
            .ok_or_else(|| Error::auth("missing session token"))?;

        Ok(AuthGrant {
            session: Session::new(token)?,
            email: entity.email.filter(|e| !e.trim().is_empty()),
            role: entity.role.filter(|r| !r.trim().is_empty()),
        })
    }

    /// Fetch the current ledger balance
    pub async fn get_balance(&self, session: &Session) -> Result<BalanceSnapshot> {
        let response = self
            .client
            .get(self.url(&self.endpoints.balance))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(SESSION_HEADER, session.token())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;
        self.check_response_status(status, &body, "balance")?;

        let parsed: BalanceResponse = serde_json::from_str(&body)
            .map_err(|e| Error::parse(format!("balance response: {}", e)))?;

        Ok(BalanceSnapshot::new(parsed.entity.ledger_balance))
    }

    /// Fetch one page of transaction history
    ///
    /// Query fields go out as headers; the body is empty. An XML answer is
    /// kept verbatim on the page instead of failing.
    pub async fn get_history(
        &self,
        session: &Session,
        query: &TransactionQuery,
    ) -> Result<TransactionPage> {
        let mut request = self
            .client
            .post(self.url(&self.endpoints.history))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(SESSION_HEADER, session.token());
        for (name, value) in query.headers() {
            request = request.header(name, value);
        }

        let response = request
            .body("")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        // XML is accepted whatever the status; JSON only on 2xx
        match HistoryPayload::parse(&body) {
            HistoryPayload::XmlFault(raw) => Ok(TransactionPage {
                page: query.page,
                batch_size: query.batch_size,
                records: Vec::new(),
                raw_xml: Some(raw),
            }),
            HistoryPayload::JsonPage(records) => {
                self.check_response_status(status, &body, "history")?;
                Ok(TransactionPage {
                    page: query.page,
                    batch_size: query.batch_size,
                    records,
                    raw_xml: None,
                })
            }
            HistoryPayload::Malformed(reason) => {
                self.check_response_status(status, &body, "history")?;
                Err(Error::format(reason))
            }
        }
    }

    async fn read_body(&self, response: Response) -> Result<String> {
        response.text().await.map_err(|e| self.map_request_error(e))
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            Error::network(format!("Unable to connect to wallet API at {}", self.base_url))
        } else {
            Error::network(format!("Wallet API request failed: {}", error))
        }
    }

    /// Non-2xx on an authenticated call is a transport-level failure
    fn check_response_status(&self, status: StatusCode, body: &str, operation: &str) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        let detail = serde_json::from_str::<JsonValue>(body)
            .ok()
            .as_ref()
            .and_then(server_message);
        Err(match detail {
            Some(message) => Error::network(format!(
                "{} request failed: HTTP {} ({})",
                operation,
                status.as_u16(),
                message
            )),
            None => Error::network(format!("{} request failed: HTTP {}", operation, status.as_u16())),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
