//! Public IP lookup over HTTP
//!
//! Works with echo services answering either `{"ip": "..."}` JSON or the bare
//! address as plain text.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::ports::IpResolver;

/// Default IP echo service
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    client: Client,
    url: String,
    timeout_secs: u64,
}

impl HttpIpResolver {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::config("IP lookup URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout_secs,
        })
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::network(format!("IP lookup timed out after {}s", self.timeout_secs))
        } else if error.is_connect() {
            Error::network("Unable to reach the IP lookup service")
        } else {
            Error::network(format!("IP lookup failed: {}", error))
        }
    }
}

/// Extract an address from a lookup body
pub(crate) fn parse_ip_body(body: &str) -> Result<String> {
    let body = body.trim();
    let candidate = match serde_json::from_str::<IpResponse>(body) {
        Ok(parsed) => parsed.ip,
        Err(_) => body.to_string(),
    };

    candidate
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| Error::network("IP lookup returned a malformed address"))
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!("IP lookup failed: HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(|e| self.map_request_error(e))?;
        let ip = parse_ip_body(&body)?;
        debug!("resolved public IP");
        Ok(ip)
    }
}

/// Resolver returning a configured address (`publicIp` setting)
#[derive(Debug, Clone)]
pub struct StaticIpResolver {
    ip: String,
}

impl StaticIpResolver {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

#[async_trait]
impl IpResolver for StaticIpResolver {
    async fn resolve(&self) -> Result<String> {
        Ok(self.ip.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_wallet::{MockConfig, MockWalletServer};
    use crate::domain::result::ErrorKind;

    #[test]
    fn test_parse_json_body() {
        assert_eq!(parse_ip_body(r#"{"ip":"203.0.113.7"}"#).unwrap(), "203.0.113.7");
    }

    #[test]
    fn test_parse_plain_body() {
        assert_eq!(parse_ip_body("2001:db8::1\n").unwrap(), "2001:db8::1");
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_ip_body("<html>rate limited</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(parse_ip_body(r#"{"ip":"not-an-ip"}"#).is_err());
    }

    #[test]
    fn test_reject_empty_url() {
        assert!(HttpIpResolver::new("", 5).is_err());
    }

    #[tokio::test]
    async fn test_resolve_against_mock() {
        let server = MockWalletServer::start(MockConfig::default()).unwrap();
        let resolver = HttpIpResolver::new(&server.ip_lookup_url(), 5).unwrap();
        assert_eq!(resolver.resolve().await.unwrap(), MockConfig::default().public_ip);
    }

    #[tokio::test]
    async fn test_resolve_non_2xx_is_network_error() {
        let server = MockWalletServer::start(MockConfig {
            fail_ip_lookup: true,
            ..Default::default()
        })
        .unwrap();
        let resolver = HttpIpResolver::new(&server.ip_lookup_url(), 5).unwrap();
        let err = resolver.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_resolve_timeout_is_network_error() {
        let server = MockWalletServer::start(MockConfig {
            delay_ms: 2500,
            ..Default::default()
        })
        .unwrap();
        let resolver = HttpIpResolver::new(&server.ip_lookup_url(), 1).unwrap();
        let err = resolver.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_resolve_unreachable() {
        // Port 9 (discard) on localhost is not listening in test environments
        let resolver = HttpIpResolver::new("http://127.0.0.1:9/ip", 2).unwrap();
        let err = resolver.resolve().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
