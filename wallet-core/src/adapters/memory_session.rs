//! In-memory session store
//!
//! The session lives exactly as long as the store (one client process, the
//! equivalent of a browser tab). Nothing is written to disk.

use std::sync::RwLock;

use crate::domain::Session;
use crate::ports::SessionStore;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slot: RwLock<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a session (tests, resumed sessions)
    pub fn with_session(session: Session) -> Self {
        Self {
            slot: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self) -> Option<Session> {
        // A poisoned lock still holds a consistent Option
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, session: Session) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }

    fn clear(&self) {
        match self.slot.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
