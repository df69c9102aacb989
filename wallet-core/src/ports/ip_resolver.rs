//! Public IP lookup port

use async_trait::async_trait;

use crate::domain::result::Result;

/// Resolves the caller's public IP address.
///
/// The authentication endpoint's fraud checks require a real address, so
/// implementations must fail with a network error rather than substitute a
/// placeholder.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn resolve(&self) -> Result<String>;
}
