//! Services - business logic layer

mod auth;
mod balance;
mod history;
pub mod logging;

pub use auth::{AuthOutcome, AuthService, LoginSummary};
pub use balance::BalanceService;
pub use history::{HistoryService, HistoryView};
