use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use portal_auth::Identity;
use portal_db::{accounts, AccountError};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{
    account_error, api_error, auth_error, missing_credentials, unknown_subject, ApiError,
};
use crate::models::*;
use crate::AppState;

/// Patient ID carried by a verified token
fn subject_id(identity: &Identity) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&identity.id).map_err(|_| {
        api_error(StatusCode::UNAUTHORIZED, "Invalid token", "INVALID_TOKEN")
    })
}

/// Account errors on routes acting on the session subject. A subject that
/// no longer exists is reported like `/api/auth/me` reports it.
fn subject_account_error(err: AccountError) -> ApiError {
    match err {
        AccountError::NotFound => unknown_subject(),
        other => account_error(other),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Log in with email and password
///
/// Sets the session cookie on success.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 503, description = "Credential store unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected login body: {}", rejection);
            return Err(missing_credentials());
        }
    };

    let email = request.email.map(|e| e.trim().to_string());
    let (Some(email), Some(password)) = (non_empty(email), non_empty(request.password)) else {
        return Err(missing_credentials());
    };

    let issued = state
        .authenticator
        .authenticate(&email, &password)
        .await
        .map_err(|e| auth_error(&e))?;

    let cookie = state
        .cookie
        .session_cookie(&issued.token, state.authenticator.token_lifetime());

    let body = LoginResponse {
        message: "Login successful".to_string(),
        user: UserSummary {
            id: issued.identity.id,
            email: issued.identity.email,
        },
        expires_at: issued.expires_at,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Log out
///
/// Always succeeds and clears the session cookie. A copy of the token held
/// elsewhere stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, state.cookie.clear_cookie())],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response()
}

/// Get the logged in patient
///
/// Re-reads the credential record, so a session whose patient was removed
/// is rejected here even though the token itself still verifies.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current patient", body = CurrentUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<CurrentUser>, ApiError> {
    let id = subject_id(&identity)?;

    let patient = accounts::find_by_id(&state.db, id)
        .await
        .map_err(account_error)?
        .ok_or_else(|| {
            warn!("Session subject {} no longer exists", id);
            unknown_subject()
        })?;

    Ok(Json(CurrentUser {
        id: patient.id.to_string(),
        email: patient.email,
        created_at: patient.created_at,
    }))
}

/// Create a patient credential record
#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Patient created", body = UserSummary),
        (status = 400, description = "Missing fields or email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(missing_credentials());
    };

    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let patient = accounts::register(&state.db, &email, &password)
        .await
        .map_err(account_error)?;

    Ok((
        StatusCode::CREATED,
        Json(UserSummary {
            id: patient.id.to_string(),
            email: patient.email,
        }),
    ))
}

/// Change the logged in patient's password
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Empty password", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = subject_id(&identity)?;
    let new_password = payload
        .ok()
        .and_then(|Json(request)| request.new_password)
        .unwrap_or_default();

    accounts::change_password(&state.db, id, &new_password)
        .await
        .map_err(subject_account_error)?;

    info!("Patient {} changed their password", id);
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// Change the logged in patient's login email
///
/// The current session keeps the old email claim until the next login.
#[utoipa::path(
    put,
    path = "/api/auth/email",
    request_body = ChangeEmailRequest,
    responses(
        (status = 200, description = "Email changed", body = UserSummary),
        (status = 400, description = "Empty or duplicate email", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_email(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ChangeEmailRequest>, JsonRejection>,
) -> Result<Json<UserSummary>, ApiError> {
    let id = subject_id(&identity)?;
    let email = payload
        .ok()
        .and_then(|Json(request)| request.email)
        .unwrap_or_default();

    let patient = accounts::change_email(&state.db, id, &email)
        .await
        .map_err(subject_account_error)?;

    Ok(Json(UserSummary {
        id: patient.id.to_string(),
        email: patient.email,
    }))
}

/// Session summary for portal pages
///
/// Unauthenticated requests are redirected to the login page.
#[utoipa::path(
    get,
    path = "/portal/session",
    responses(
        (status = 200, description = "Verified session identity", body = UserSummary),
        (status = 303, description = "Redirect to login page")
    ),
    tag = "portal"
)]
pub async fn portal_session(Extension(identity): Extension<Identity>) -> Json<UserSummary> {
    Json(UserSummary {
        id: identity.id,
        email: identity.email,
    })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database_ok = state.db.ping().await.is_ok();

    Json(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" }.to_string(),
        database: if database_ok { "connected" } else { "unavailable" }.to_string(),
    })
}
