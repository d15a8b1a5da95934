//! Credential lookup seam
//!
//! The authenticator only needs to find one record by email. Persistence
//! lives elsewhere (see the `portal-db` crate); this trait keeps the
//! authenticator independent of the ORM.

use async_trait::async_trait;
use thiserror::Error;

/// Stored identity and password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Patient ID (opaque)
    pub id: String,
    /// Unique email
    pub email: String,
    /// Argon2id PHC hash
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed or could not be reached
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the single record with this email, if any
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;
}
