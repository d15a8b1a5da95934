//! Error taxonomy of the session authenticator

use thiserror::Error;

/// Errors returned by [`crate::Authenticator`]
///
/// Display strings are safe to show to callers. Anything more specific
/// (database errors, hash parse failures) is logged where it happens and
/// never carried in the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases are never distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token is malformed, unsigned, signed with another key or tampered with
    #[error("Invalid token")]
    InvalidToken,

    /// Token is older than the configured lifetime
    #[error("Token expired")]
    TokenExpired,

    /// Credential store could not be reached in time
    #[error("Authentication service unavailable")]
    AuthBackendUnavailable,

    /// Unexpected failure (corrupt stored hash, worker panic)
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::AuthBackendUnavailable => "AUTH_BACKEND_UNAVAILABLE",
            AuthError::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether the error means "the caller is not authenticated"
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}
