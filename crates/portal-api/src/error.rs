//! Mapping of domain errors to HTTP responses
//!
//! Bodies carry the public message and a stable code only. Database and
//! hashing details are logged here and dropped.

use axum::{http::StatusCode, Json};
use portal_auth::AuthError;
use portal_db::AccountError;
use tracing::error;

use crate::models::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: Some(code.to_string()),
        }),
    )
}

pub fn missing_credentials() -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "Email and password are required",
        "MISSING_FIELDS",
    )
}

pub fn auth_error(err: &AuthError) -> ApiError {
    let status = match err {
        AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::AuthBackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    api_error(status, err.to_string(), err.code())
}

pub fn account_error(err: AccountError) -> ApiError {
    match err {
        AccountError::MissingCredentials => missing_credentials(),
        AccountError::EmptyEmail | AccountError::EmptyPassword => {
            api_error(StatusCode::BAD_REQUEST, err.to_string(), "INVALID_INPUT")
        }
        AccountError::EmailTaken => {
            api_error(StatusCode::BAD_REQUEST, err.to_string(), "EMAIL_TAKEN")
        }
        AccountError::NotFound => {
            api_error(StatusCode::NOT_FOUND, err.to_string(), "PATIENT_NOT_FOUND")
        }
        AccountError::Password(e) => {
            error!("Password hashing failed: {}", e);
            internal_error()
        }
        AccountError::Database(e) => {
            error!("Database error: {}", e);
            internal_error()
        }
    }
}

/// Verified token whose patient no longer exists
pub fn unknown_subject() -> ApiError {
    api_error(
        StatusCode::UNAUTHORIZED,
        "Session subject no longer exists",
        "UNKNOWN_SUBJECT",
    )
}

pub fn internal_error() -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "INTERNAL_ERROR",
    )
}
