//! API credentials and the authentication request body

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Static API key/secret pair supplied by deployment configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Build credentials from optional parts, failing with a config error
    /// when either is absent or blank.
    pub fn from_parts(api_key: Option<&str>, api_secret: Option<&str>) -> Result<Self> {
        let credentials = Self::new(api_key.unwrap_or_default(), api_secret.unwrap_or_default());
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Both fields must be non-blank
    pub fn validate(&self) -> Result<()> {
        match (self.api_key.trim().is_empty(), self.api_secret.trim().is_empty()) {
            (false, false) => Ok(()),
            (true, true) => Err(Error::config("API key and API secret are not configured")),
            (true, false) => Err(Error::config("API key is not configured")),
            (false, true) => Err(Error::config("API secret is not configured")),
        }
    }
}

// Never print the secret
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// JSON body posted to the authentication endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequest {
    pub api_key: String,
    pub api_secret: String,
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraData {
    pub ip_address: String,
}

impl AuthenticationRequest {
    pub fn new(credentials: &Credentials, ip_address: impl Into<String>) -> Self {
        Self {
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
            extra_data: ExtraData {
                ip_address: ip_address.into(),
            },
        }
    }
}
