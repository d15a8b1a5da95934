//! Session token signing and verification (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Tolerated clock skew for `iat` values slightly ahead of the verifier
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Verified subject of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Patient ID (opaque)
    pub id: String,
    /// Patient email at the time of login
    pub email: String,
}

/// JWT claims for a portal session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (patient ID)
    pub sub: String,
    /// Subject email
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds). Informational only: verification
    /// recomputes expiry from `iat`.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        let iat = issued_at.timestamp();

        Self {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            iat,
            exp: iat + lifetime.num_seconds(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
        }
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

/// Signs and verifies session tokens with one symmetric secret
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenSigner {
    /// Create a signer using HMAC-SHA256
    ///
    /// Validates ONLY the signature. The `exp` claim is ignored by the JWT
    /// library; [`TokenSigner::verify_at`] derives expiry from `iat` and the
    /// configured lifetime instead.
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a token for `identity` issued at `issued_at`
    pub fn issue(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = SessionClaims::new(identity, issued_at, self.lifetime);
        self.encode(&claims)
    }

    /// Sign arbitrary claims. Exposed for tooling and tests that need to
    /// mint tokens with unusual contents.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Identity, JwtError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, JwtError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| JwtError::InvalidToken)?;
        let claims = token_data.claims;

        let now = now.timestamp();
        if claims.iat > now + MAX_FUTURE_SKEW_SECS {
            return Err(JwtError::InvalidToken);
        }

        let expires_at = claims
            .iat
            .checked_add(self.lifetime.num_seconds())
            .ok_or(JwtError::InvalidToken)?;
        if now > expires_at {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims.identity())
    }
}
