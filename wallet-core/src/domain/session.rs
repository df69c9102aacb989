//! Session token and the locally constructed user identity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::result::{Error, Result};

/// Ephemeral session issued by the authentication endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Wrap a token. Blank tokens are rejected so a stored session is always usable.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::auth("missing session token"));
        }
        Ok(Self {
            token,
            created_at: Utc::now(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Short SHA-256 prefix of the token, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.token.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("fingerprint", &self.fingerprint())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Represents the signed-in user as known to the client.
///
/// The remote API only issues a token; identity is either fabricated locally
/// or lifted from the authentication response, depending on configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    pub role: String,
    /// True when the server supplied any of the identity fields
    pub server_verified: bool,
}

impl UserIdentity {
    pub fn local(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: role.into(),
            server_verified: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_rejected() {
        assert!(Session::new("").is_err());
        assert!(Session::new("   ").is_err());
        assert_eq!(Session::new("abc").unwrap().token(), "abc");
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = Session::new("token-1").unwrap();
        let b = Session::new("token-1").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert_ne!(a.fingerprint(), Session::new("token-2").unwrap().fingerprint());
    }

    #[test]
    fn test_debug_hides_token() {
        let session = Session::new("super-secret-token").unwrap();
        assert!(!format!("{:?}", session).contains("super-secret-token"));
    }

    #[test]
    fn test_local_identity() {
        let user = UserIdentity::local("test@example.com", "admin");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.role, "admin");
        assert!(!user.server_verified);
    }
}
