//! Session Authentication Middleware
//!
//! Extracts the session token from the session cookie (or an
//! `Authorization: Bearer` header for API clients), verifies it, and makes
//! the [`Identity`] available to handlers via Axum's Extension.
//!
//! Verification is stateless. Handlers that need the subject to still exist
//! must re-fetch it.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use portal_auth::{Authenticator, Identity};
use std::sync::Arc;
use tracing::debug;

use crate::cookie::read_cookie;
use crate::error::{api_error, auth_error};
use crate::models::ErrorResponse;

/// Where unauthenticated page requests are sent
const LOGIN_PAGE: &str = "/";

/// State shared across middleware instances
#[derive(Clone)]
pub struct SessionState {
    pub authenticator: Arc<Authenticator>,
    pub cookie_name: String,
}

impl SessionState {
    pub fn new(authenticator: Arc<Authenticator>, cookie_name: impl Into<String>) -> Self {
        Self {
            authenticator,
            cookie_name: cookie_name.into(),
        }
    }
}

/// Token lookup failure
#[derive(Debug, PartialEq, Eq)]
pub enum TokenLookupError {
    Missing,
    MalformedAuthorization,
}

/// Read the session token, preferring the cookie over the Authorization header
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, TokenLookupError> {
    if let Some(token) = read_cookie(headers, cookie_name) {
        return Ok(token.to_string());
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TokenLookupError::Missing)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(TokenLookupError::MalformedAuthorization)
}

/// Authentication middleware for API routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - Both cookie and Authorization header are missing
/// - The Authorization header is not a Bearer token
/// - Token is malformed, tampered with or signed with another key
/// - Token is expired
pub async fn require_auth(
    State(state): State<Arc<SessionState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_token(request.headers(), &state.cookie_name).map_err(|e| match e {
        TokenLookupError::Missing => api_error(
            StatusCode::UNAUTHORIZED,
            "Missing authentication token (cookie or Authorization header)",
            "MISSING_AUTH",
        ),
        TokenLookupError::MalformedAuthorization => api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format. Expected 'Bearer <token>'",
            "INVALID_AUTH_FORMAT",
        ),
    })?;

    let identity = state
        .authenticator
        .verify(&token)
        .map_err(|e| auth_error(&e))?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Authentication middleware for page routes
///
/// Same checks as [`require_auth`], but any failure redirects to the login
/// page instead of returning 401.
pub async fn redirect_unauthenticated(
    State(state): State<Arc<SessionState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity: Option<Identity> = extract_token(request.headers(), &state.cookie_name)
        .ok()
        .and_then(|token| state.authenticator.verify(&token).ok());

    match identity {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            debug!("Unauthenticated page request to {}", request.uri().path());
            Redirect::to(LOGIN_PAGE).into_response()
        }
    }
}
