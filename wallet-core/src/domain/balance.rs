//! Balance snapshot domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger balance read at a point in time. Not cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub ledger_balance: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(ledger_balance: Decimal) -> Self {
        Self {
            ledger_balance,
            fetched_at: Utc::now(),
        }
    }
}

/// What a presentation layer shows for the balance.
///
/// A failed fetch displays as zero, but stays distinguishable from a real zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceDisplay {
    Available { amount: Decimal },
    Unavailable { reason: String },
}

impl BalanceDisplay {
    pub fn from_result<E: std::fmt::Display>(result: &Result<BalanceSnapshot, E>) -> Self {
        match result {
            Ok(snapshot) => BalanceDisplay::Available {
                amount: snapshot.ledger_balance,
            },
            Err(e) => BalanceDisplay::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    /// Amount to render; zero when unavailable
    pub fn amount(&self) -> Decimal {
        match self {
            BalanceDisplay::Available { amount } => *amount,
            BalanceDisplay::Unavailable { .. } => Decimal::ZERO,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BalanceDisplay::Available { .. })
    }
}
