//! Session authentication for the patient portal
//!
//! Credentials are checked against salted Argon2id hashes, successful logins
//! produce a signed HS256 session token, and every protected request path
//! calls [`Authenticator::verify`] to recover the caller's [`Identity`].
//!
//! Verification is stateless. There is no server-side revocation list: a
//! token stays valid until its absolute expiry even after the client has
//! discarded its cookie.

pub mod authenticator;
pub mod config;
pub mod error;
pub mod jwt;
pub mod password;
pub mod store;

pub use authenticator::{Authenticator, IssuedToken};
pub use config::{AuthConfig, ConfigError, MIN_SECRET_LEN};
pub use error::AuthError;
pub use jwt::{Identity, JwtError, SessionClaims, TokenSigner};
pub use password::{hash_password, verify_password, PasswordError};
pub use store::{CredentialRecord, CredentialStore, StoreError};

// Re-export useful types
pub use async_trait::async_trait;
