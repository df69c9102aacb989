//! Transaction history domain models

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Default page size used by the merchant dashboard
pub const DEFAULT_BATCH_SIZE: u32 = 20;

/// Canonical transaction record
///
/// `occurred_at` is kept as the server's opaque string; the API does not
/// promise a single timestamp format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub description: String,
    pub amount: Decimal,
    pub occurred_at: String,
}

/// A date-filtered page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// 1-based
    pub page: u32,
    pub batch_size: u32,
}

impl TransactionQuery {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, page: u32, batch_size: u32) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        if page == 0 {
            return Err(Error::validation("page numbers start at 1"));
        }
        if batch_size == 0 {
            return Err(Error::validation("batch size must be positive"));
        }
        Ok(Self {
            start,
            end,
            page,
            batch_size,
        })
    }

    /// Same range, different page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// `start` header value, `YYYY-MM-DD HH:MM:SS`
    pub fn start_header(&self) -> String {
        self.start.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// `end` header value. Seconds are pinned to 59 so the range covers the
    /// whole final minute.
    pub fn end_header(&self) -> String {
        self.end.format("%Y-%m-%d %H:%M:59").to_string()
    }

    /// Header name/value pairs for the history request, in wire order
    pub fn headers(&self) -> [(&'static str, String); 4] {
        [
            ("start", self.start_header()),
            ("end", self.end_header()),
            ("currentPage", self.page.to_string()),
            ("batchSize", self.batch_size.to_string()),
        ]
    }
}

/// Parse a date/time as typed into a `datetime-local` style field.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, the same with a space separator,
/// or a bare `YYYY-MM-DD` (midnight).
pub fn parse_datetime_input(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::validation(format!("invalid date/time: '{}'", input)))
}

/// One page of history as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub page: u32,
    pub batch_size: u32,
    pub records: Vec<TransactionRecord>,
    /// Raw XML body when the server answered with XML instead of JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_xml: Option<String>,
}

impl TransactionPage {
    pub fn result_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_degraded(&self) -> bool {
        self.raw_xml.is_some()
    }

    /// The API never reports a total. A short page, an empty page, or an XML
    /// answer all mean there is nothing further to fetch.
    pub fn is_last_page(&self) -> bool {
        self.is_degraded() || self.records.len() < self.batch_size as usize
    }
}

/// Result of the single parse step over a history response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPayload {
    JsonPage(Vec<TransactionRecord>),
    XmlFault(String),
    Malformed(String),
}

/// Page counter for Next/Previous navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl PageCursor {
    pub fn new(page: u32) -> Self {
        Self { page: page.max(1) }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Advance unconditionally; the total is unknown
    pub fn next(&mut self) -> u32 {
        self.page = self.page.saturating_add(1);
        self.page
    }

    /// Step back, never below page 1
    pub fn previous(&mut self) -> u32 {
        self.page = self.page.saturating_sub(1).max(1);
        self.page
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 1
    }
}
