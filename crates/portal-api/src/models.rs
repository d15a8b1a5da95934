//! Request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Login request
///
/// Fields are optional so that a missing field is reported as 400 with the
/// usual error body instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Patient email address
    #[serde(default)]
    pub email: Option<String>,
    /// Patient password
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of a patient's identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    /// Patient UUID
    pub id: String,
    /// Patient email
    pub email: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// Logged in patient
    pub user: UserSummary,
    /// Absolute session expiry
    pub expires_at: DateTime<Utc>,
}

/// Signup request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Current patient, re-read from the credential store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Password change request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Email change request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChangeEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded")
    pub status: String,
    /// Database reachability ("connected" or "unavailable")
    pub database: String,
}
