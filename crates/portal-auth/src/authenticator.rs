//! Session Authenticator
//!
//! `authenticate` turns an email/password pair into a signed session token;
//! `verify` turns a token back into an [`Identity`]. Only `authenticate`
//! performs I/O (one credential lookup, bounded by the configured timeout).

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::jwt::{Identity, JwtError, TokenSigner};
use crate::password::{dummy_hash, spawn_verify_dummy, spawn_verify_password, PasswordError};
use crate::store::CredentialStore;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Signed session token (cookie value)
    pub token: String,
    /// Subject the token was issued for
    pub identity: Identity,
    /// Issuance instant, truncated to whole seconds
    pub issued_at: DateTime<Utc>,
    /// Absolute expiry (`issued_at` + lifetime)
    pub expires_at: DateTime<Utc>,
}

pub struct Authenticator {
    signer: TokenSigner,
    store: Arc<dyn CredentialStore>,
    store_timeout: std::time::Duration,
}

impl Authenticator {
    /// Builds the unknown-email dummy hash up front (once per process), so
    /// call this at startup rather than on a request path.
    pub fn new(config: &AuthConfig, store: Arc<dyn CredentialStore>) -> Self {
        if dummy_hash().is_none() {
            error!("Failed to build dummy password hash, unknown-email logins will be faster");
        }

        Self {
            signer: TokenSigner::new(config.signing_secret(), config.token_lifetime()),
            store,
            store_timeout: config.store_timeout(),
        }
    }

    pub fn token_lifetime(&self) -> Duration {
        self.signer.lifetime()
    }

    /// Check credentials and issue a session token
    ///
    /// Unknown email and wrong password both yield
    /// [`AuthError::InvalidCredentials`], after the same amount of hashing work.
    /// The email is trimmed the same way signup trims it.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let lookup =
            tokio::time::timeout(self.store_timeout, self.store.find_by_email(email)).await;
        let record = match lookup {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                error!("Credential lookup failed: {}", e);
                return Err(AuthError::AuthBackendUnavailable);
            }
            Err(_) => {
                error!("Credential lookup timed out after {:?}", self.store_timeout);
                return Err(AuthError::AuthBackendUnavailable);
            }
        };

        let Some(record) = record else {
            if let Err(e) = spawn_verify_dummy(password.to_string()).await {
                error!("Dummy password verification failed: {}", e);
            }
            warn!("Login rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        match spawn_verify_password(password.to_string(), record.password_hash.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials);
            }
            Err(PasswordError::InvalidHashFormat(e)) => {
                error!("Stored password hash for {} is unusable: {}", record.id, e);
                return Err(AuthError::Internal);
            }
            Err(e) => {
                error!("Password verification failed: {}", e);
                return Err(AuthError::Internal);
            }
        }

        let identity = Identity {
            id: record.id,
            email: record.email,
        };
        let issued = self.issue(identity, Utc::now())?;

        info!("Session issued for patient {}", issued.identity.id);
        Ok(issued)
    }

    fn issue(&self, identity: Identity, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let issued_at = DateTime::<Utc>::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        let token = self.signer.issue(&identity, issued_at).map_err(|e| {
            error!("Failed to sign session token: {}", e);
            AuthError::Internal
        })?;

        Ok(IssuedToken {
            token,
            identity,
            issued_at,
            expires_at: issued_at + self.signer.lifetime(),
        })
    }

    /// Verify a session token against the current time
    ///
    /// Stateless: the subject is not re-checked against the credential store.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        self.signer.verify_at(token, now).map_err(|e| {
            debug!("Session token rejected: {}", e);
            match e {
                JwtError::TokenExpired => AuthError::TokenExpired,
                JwtError::InvalidToken | JwtError::EncodingError(_) => AuthError::InvalidToken,
            }
        })
    }
}
