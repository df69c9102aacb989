//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod ip_resolver;
mod session_store;

pub use ip_resolver::IpResolver;
pub use session_store::SessionStore;
