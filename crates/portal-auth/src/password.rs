//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password using Argon2id
///
/// Uses the crate defaults (19 MiB memory, 2 iterations, 1 lane) and a fresh
/// random 16-byte salt per call, so equal passwords never share a hash.
///
/// # Example
/// ```
/// use portal_auth::password::hash_password;
///
/// let hash = hash_password("Password123!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a PHC-formatted hash
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// itself is unusable.
///
/// # Example
/// ```
/// use portal_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("Password123!").unwrap();
/// assert!(verify_password("Password123!", &hash).unwrap());
/// assert!(!verify_password("wrong", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// [`hash_password`] on the blocking thread pool
pub async fn spawn_hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
}

/// [`verify_password`] on the blocking thread pool
pub async fn spawn_verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
}

/// Hash that unknown-email logins are checked against, so that a miss costs
/// the same Argon2 work as a wrong password. `None` if hashing failed.
pub(crate) fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("portal-dummy-password").ok())
        .as_deref()
}

/// [`verify_password`] against the dummy hash, on the blocking thread pool
///
/// Always `Ok(false)` unless the dummy hash could not be built.
pub async fn spawn_verify_dummy(password: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || {
        let hash = dummy_hash().ok_or_else(|| {
            PasswordError::HashingFailed("dummy hash unavailable".to_string())
        })?;
        verify_password(&password, hash)
    })
    .await
    .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
}
