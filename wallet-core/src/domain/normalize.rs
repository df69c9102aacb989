//! Response normalization for transaction history
//!
//! The history endpoint has returned two record shapes over time:
//! `{summary, amount, creationTime}` and `{description, amount}`. Both, plus
//! the canonical `{description, amount, occurredAt}` shape, converge here.

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use super::transaction::{HistoryPayload, TransactionRecord};

pub const DEFAULT_DESCRIPTION: &str = "No description";
pub const DEFAULT_OCCURRED_AT: &str = "Unknown time";

/// Prefix that marks a degraded XML body
const XML_DECLARATION: &str = "<?xml";

/// Map one raw history record to the canonical shape.
///
/// Never fails; missing or unusable fields take the documented defaults.
pub fn normalize(raw: &JsonValue) -> TransactionRecord {
    let description = text_field(raw, "summary")
        .or_else(|| text_field(raw, "description"))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let amount = raw
        .get("amount")
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO);

    let occurred_at = text_field(raw, "creationTime")
        .or_else(|| text_field(raw, "occurredAt"))
        .unwrap_or_else(|| DEFAULT_OCCURRED_AT.to_string());

    TransactionRecord {
        description,
        amount,
        occurred_at,
    }
}

fn text_field(raw: &JsonValue, key: &str) -> Option<String> {
    match raw.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Amount that can be number or string
fn decimal_from_json(value: &JsonValue) -> Option<Decimal> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return None,
    };
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

impl HistoryPayload {
    /// Classify a raw history body.
    ///
    /// XML is recognised by its declaration and kept verbatim. Anything else
    /// must be a JSON object whose `entity` is an array.
    pub fn parse(body: &str) -> Self {
        if body.trim_start_matches('\u{feff}').starts_with(XML_DECLARATION) {
            return HistoryPayload::XmlFault(body.to_string());
        }

        let value: JsonValue = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => return HistoryPayload::Malformed(format!("invalid JSON: {}", e)),
        };

        match value.get("entity") {
            Some(JsonValue::Array(items)) => {
                HistoryPayload::JsonPage(items.iter().map(normalize).collect())
            }
            Some(JsonValue::Null) | None => {
                let reason = server_message(&value)
                    .map(|m| format!("response has no entity: {}", m))
                    .unwrap_or_else(|| "response has no entity".to_string());
                HistoryPayload::Malformed(reason)
            }
            Some(_) => HistoryPayload::Malformed("entity is not an array".to_string()),
        }
    }
}

/// Pull a human-readable message out of an error envelope
pub fn server_message(value: &JsonValue) -> Option<String> {
    ["message", "description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .or_else(|| {
            value
                .get("entity")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
        })
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
