//! Session store port

use crate::domain::Session;

/// Holds at most one session for the lifetime of the client.
///
/// Last write wins; storing a new session silently replaces the previous one.
/// There is no expiry beyond what the server enforces.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Session>;

    fn set(&self, session: Session);

    fn clear(&self);

    fn has_session(&self) -> bool {
        self.get().is_some()
    }
}
