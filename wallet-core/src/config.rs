//! Configuration management
//!
//! Settings come from `settings.json` in the client directory, overridden by
//! environment variables. Credentials are read from the environment only and
//! are never written back to disk.
//!
//! ```json
//! {
//!   "api": { "baseUrl": "...", "authPath": "/auth/login", ... },
//!   "ipLookupUrl": "https://api.ipify.org?format=json",
//!   "publicIp": null,
//!   "timeoutSecs": 30,
//!   "batchSize": 20,
//!   "identity": { "source": "local", "defaultRole": "admin" },
//!   "demoMode": false
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::ip_lookup::DEFAULT_IP_LOOKUP_URL;
use crate::adapters::wallet_api::{Endpoints, DEFAULT_BASE_URL};
use crate::domain::result::{Error, Result};
use crate::domain::transaction::DEFAULT_BATCH_SIZE;
use crate::domain::Credentials;

pub const API_KEY_ENV: &str = "MW_API_KEY";
pub const API_SECRET_ENV: &str = "MW_API_SECRET";
pub const BASE_URL_ENV: &str = "MW_BASE_URL";
pub const IP_LOOKUP_URL_ENV: &str = "MW_IP_LOOKUP_URL";
pub const TIMEOUT_ENV: &str = "MW_TIMEOUT_SECS";
pub const BATCH_SIZE_ENV: &str = "MW_BATCH_SIZE";
pub const DEMO_MODE_ENV: &str = "MW_DEMO_MODE";
pub const PUBLIC_IP_ENV: &str = "MW_PUBLIC_IP";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ROLE: &str = "admin";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip_lookup_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(default)]
    identity: IdentitySettings,
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    balance_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    history_path: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentitySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<IdentitySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_role: Option<String>,
}

/// Where the signed-in user's identity comes from after token exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Built locally from the email the user typed and the default role
    #[default]
    Local,
    /// Taken from `entity.email` / `entity.role` when the server sends them,
    /// falling back to the local values
    Response,
}

impl std::str::FromStr for IdentitySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(IdentitySource::Local),
            "response" => Ok(IdentitySource::Response),
            other => Err(Error::config(format!(
                "Unknown identity source '{}'. Expected local or response",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPolicy {
    pub source: IdentitySource,
    pub default_role: String,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            source: IdentitySource::Local,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }
}

/// Client configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub ip_lookup_url: String,
    /// Fixed public address; skips the IP lookup when set
    pub public_ip: Option<String>,
    pub timeout_secs: u64,
    pub batch_size: u32,
    pub identity: IdentityPolicy,
    pub demo_mode: bool,
    api_key: Option<String>,
    api_secret: Option<String>,
    // The file as loaded; `save` writes this, never the resolved values
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            public_ip: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            identity: IdentityPolicy::default(),
            demo_mode: false,
            api_key: None,
            api_secret: None,
            raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the client directory and the process environment
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with_env(dir, |name| std::env::var(name).ok())
    }

    /// Load config with an explicit environment lookup
    pub fn load_with_env<F>(dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = dir.join(SETTINGS_FILE);
        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let defaults = Endpoints::default();

        let timeout_secs = match env(TIMEOUT_ENV) {
            Some(v) => parse_env(TIMEOUT_ENV, &v)?,
            None => raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let batch_size = match env(BATCH_SIZE_ENV) {
            Some(v) => parse_env(BATCH_SIZE_ENV, &v)?,
            None => raw.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        let demo_mode = match env(DEMO_MODE_ENV).as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.demo_mode,
        };

        let config = Self {
            base_url: env(BASE_URL_ENV)
                .or_else(|| raw.api.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            endpoints: Endpoints {
                auth: raw.api.auth_path.clone().unwrap_or(defaults.auth),
                balance: raw.api.balance_path.clone().unwrap_or(defaults.balance),
                history: raw.api.history_path.clone().unwrap_or(defaults.history),
            },
            ip_lookup_url: env(IP_LOOKUP_URL_ENV)
                .or_else(|| raw.ip_lookup_url.clone())
                .unwrap_or_else(|| DEFAULT_IP_LOOKUP_URL.to_string()),
            public_ip: env(PUBLIC_IP_ENV).or_else(|| raw.public_ip.clone()),
            timeout_secs,
            batch_size,
            identity: IdentityPolicy {
                source: raw.identity.source.unwrap_or_default(),
                default_role: raw
                    .identity
                    .default_role
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            },
            demo_mode,
            api_key: env(API_KEY_ENV),
            api_secret: env(API_SECRET_ENV),
            raw_settings: raw,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config pointing every endpoint at `base_url` (mock server, staging)
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            base_url: base.to_string(),
            ip_lookup_url: format!("{}/ip", base),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Credentials from the environment; config error when either is missing
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::from_parts(self.api_key.as_deref(), self.api_secret.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::config("timeoutSecs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batchSize must be positive"));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::config("API base URL is empty"));
        }
        if let Some(ip) = &self.public_ip {
            if ip.trim().parse::<std::net::IpAddr>().is_err() {
                return Err(Error::config(format!("publicIp '{}' is not an IP address", ip)));
            }
        }
        Ok(())
    }

    /// Save settings to the client directory
    ///
    /// Writes the file as it was loaded plus changes made through `set` and
    /// the demo toggles. Environment overrides and credentials are never
    /// persisted; unknown fields are kept.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(&self.raw_settings)?;
        std::fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Update one setting by its settings.json key
    ///
    /// The resolved value and the persisted settings both change; nothing
    /// changes when the new value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        let raw = &mut next.raw_settings;
        match key {
            "baseUrl" | "api.baseUrl" => {
                next.base_url = value.trim_end_matches('/').to_string();
                raw.api.base_url = Some(next.base_url.clone());
            }
            "authPath" | "api.authPath" => {
                next.endpoints.auth = value.to_string();
                raw.api.auth_path = Some(value.to_string());
            }
            "balancePath" | "api.balancePath" => {
                next.endpoints.balance = value.to_string();
                raw.api.balance_path = Some(value.to_string());
            }
            "historyPath" | "api.historyPath" => {
                next.endpoints.history = value.to_string();
                raw.api.history_path = Some(value.to_string());
            }
            "ipLookupUrl" => {
                next.ip_lookup_url = value.to_string();
                raw.ip_lookup_url = Some(value.to_string());
            }
            "publicIp" => {
                next.public_ip = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                raw.public_ip = next.public_ip.clone();
            }
            "timeoutSecs" => {
                next.timeout_secs = parse_env(key, value)?;
                raw.timeout_secs = Some(next.timeout_secs);
            }
            "batchSize" => {
                next.batch_size = parse_env(key, value)?;
                raw.batch_size = Some(next.batch_size);
            }
            "identity.source" => {
                next.identity.source = value.parse()?;
                raw.identity.source = Some(next.identity.source);
            }
            "identity.defaultRole" => {
                next.identity.default_role = value.to_string();
                raw.identity.default_role = Some(value.to_string());
            }
            "demoMode" => {
                next.demo_mode = parse_env(key, value)?;
                raw.demo_mode = next.demo_mode;
            }
            _ => return Err(Error::config(format!("Unknown setting '{}'", key))),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
        self.raw_settings.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
        self.raw_settings.demo_mode = false;
    }

    /// Settings as shown by `mw config show`. Credentials are reported as
    /// present/absent only.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "baseUrl": self.base_url,
            "authPath": self.endpoints.auth,
            "balancePath": self.endpoints.balance,
            "historyPath": self.endpoints.history,
            "ipLookupUrl": self.ip_lookup_url,
            "publicIp": self.public_ip,
            "timeoutSecs": self.timeout_secs,
            "batchSize": self.batch_size,
            "identity": self.identity,
            "demoMode": self.demo_mode,
            "apiKeyConfigured": self.api_key.is_some(),
            "apiSecretConfigured": self.api_secret.is_some(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| Error::config(format!("Invalid value '{}' for {}", value, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::ErrorKind;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.identity.source, IdentitySource::Local);
        assert_eq!(config.identity.default_role, "admin");
        assert!(!config.demo_mode);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(dir.path(), |name| {
            (name == API_KEY_ENV).then(|| "key".to_string())
        })
        .unwrap();
        let err = config.credentials().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_env_overrides_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"api":{"baseUrl":"https://from-file.example"},"batchSize":50,"demoMode":true}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), |name| match name {
            BASE_URL_ENV => Some("https://from-env.example".to_string()),
            DEMO_MODE_ENV => Some("0".to_string()),
            API_KEY_ENV => Some("k".to_string()),
            API_SECRET_ENV => Some("s".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.base_url, "https://from-env.example");
        assert_eq!(config.batch_size, 50);
        assert!(!config.demo_mode);
        assert_eq!(config.credentials().unwrap().api_key(), "k");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let err = Config::load_with_env(dir.path(), |name| {
            (name == BATCH_SIZE_ENV).then(|| "0".to_string())
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = Config::load_with_env(dir.path(), |name| {
            (name == TIMEOUT_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_ENV));

        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        assert!(Config::load_with_env(dir.path(), no_env).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_fields_and_omits_credentials() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme":"dark","api":{"region":"ng"}}"#,
        )
        .unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env)
            .unwrap()
            .with_credentials("key", "secret");
        config.set("batchSize", "10").unwrap();
        config.set("identity.source", "response").unwrap();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(content.contains("\"theme\""));
        assert!(content.contains("\"region\""));
        assert!(!content.contains("secret"));

        let reloaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(reloaded.batch_size, 10);
        assert_eq!(reloaded.identity.source, IdentitySource::Response);
    }

    #[test]
    fn test_save_never_persists_env_overrides() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_with_env(dir.path(), |name| match name {
            PUBLIC_IP_ENV => Some("198.51.100.9".to_string()),
            BASE_URL_ENV => Some("http://staging.local".to_string()),
            TIMEOUT_ENV => Some("5".to_string()),
            DEMO_MODE_ENV => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.public_ip.as_deref(), Some("198.51.100.9"));

        config.set("batchSize", "10").unwrap();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(!content.contains("198.51.100.9"));
        assert!(!content.contains("staging.local"));

        let reloaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(reloaded.batch_size, 10);
        assert!(reloaded.public_ip.is_none());
        assert_eq!(reloaded.base_url, DEFAULT_BASE_URL);
        assert_eq!(reloaded.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!reloaded.demo_mode);
    }

    #[test]
    fn test_demo_toggle_is_persisted() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();
        assert!(Config::load_with_env(dir.path(), no_env).unwrap().demo_mode);

        config.disable_demo_mode();
        config.save(dir.path()).unwrap();
        assert!(!Config::load_with_env(dir.path(), no_env).unwrap().demo_mode);
    }

    #[test]
    fn test_invalid_set_leaves_config_unchanged() {
        let mut config = Config::default();
        assert!(config.set("timeoutSecs", "0").is_err());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = Config::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("identity.source", "ldap").is_err());
        assert!(config.set("batchSize", "0").is_err());
        assert!(config.set("publicIp", "localhost").is_err());
        assert!(config.public_ip.is_none());
        config.set("publicIp", "198.51.100.4").unwrap();
        assert_eq!(config.public_ip.as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_for_base_url() {
        let config = Config::for_base_url("http://127.0.0.1:4000/");
        assert_eq!(config.base_url, "http://127.0.0.1:4000");
        assert_eq!(config.ip_lookup_url, "http://127.0.0.1:4000/ip");
    }

    #[test]
    fn test_summary_hides_credentials() {
        let config = Config::default().with_credentials("key-123", "secret-456");
        let summary = config.summary().to_string();
        assert!(!summary.contains("key-123"));
        assert!(!summary.contains("secret-456"));
        assert!(summary.contains("\"apiKeyConfigured\":true"));
    }
}
