//! Authenticator configuration
//!
//! The signing secret is injected once at startup. There is no built-in
//! fallback: a missing or short secret is a deployment error and must stop
//! the process before it serves traffic.

use chrono::Duration;
use std::fmt;
use thiserror::Error;

/// Minimum accepted signing secret length in bytes (HS256 key size)
pub const MIN_SECRET_LEN: usize = 32;

/// Absolute session lifetime: 24 hours from issuance
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60 * 60 * 24;

/// Default timeout for one credential store lookup
pub const DEFAULT_STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT signing secret is not configured")]
    MissingSecret,

    #[error("JWT signing secret is too short ({len} bytes, need at least 32)")]
    WeakSecret { len: usize },
}

/// Validated authenticator configuration
#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: Vec<u8>,
    token_lifetime: Duration,
    store_timeout: std::time::Duration,
}

impl AuthConfig {
    /// Validate a signing secret and build a config with default lifetimes
    pub fn new(signing_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = signing_secret.into();

        if secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret { len: secret.len() });
        }

        Ok(Self {
            signing_secret: secret.into_bytes(),
            token_lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        })
    }

    /// Load the secret from an optional value (typically an env var)
    pub fn from_optional(signing_secret: Option<String>) -> Result<Self, ConfigError> {
        Self::new(signing_secret.ok_or(ConfigError::MissingSecret)?)
    }

    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn signing_secret(&self) -> &[u8] {
        &self.signing_secret
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        self.store_timeout
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}
