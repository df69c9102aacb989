//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the wallet API
//! - reqwest HTTP client for the IpResolver port (public IP echo service)
//! - In-memory slot for the SessionStore port
//! - Local mock server emulating the wallet API (demo mode, tests)

pub mod ip_lookup;
pub mod memory_session;
pub mod mock_wallet;
pub mod wallet_api;
