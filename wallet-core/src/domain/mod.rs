//! Core domain entities
//!
//! Pure data structures with validation logic. The only non-trivial code here
//! is response normalization, which is a pure function over JSON values.

pub mod balance;
mod credentials;
pub mod normalize;
pub mod result;
mod session;
pub mod transaction;

pub use balance::{BalanceDisplay, BalanceSnapshot};
pub use credentials::{AuthenticationRequest, Credentials, ExtraData};
pub use session::{Session, UserIdentity};
pub use transaction::{
    HistoryPayload, PageCursor, TransactionPage, TransactionQuery, TransactionRecord,
};
