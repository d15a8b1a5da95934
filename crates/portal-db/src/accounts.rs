//! Credential record mutations
//!
//! Signup, password change and email change are separate operations. A
//! password change never touches the email and an email change never
//! touches the hash, so an omitted password can not overwrite a stored one.

use chrono::Utc;
use portal_auth::password::spawn_hash_password;
use portal_auth::PasswordError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::entities::{patient, Patient};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Email must not be empty")]
    EmptyEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Patient not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn map_unique_violation(e: DbErr) -> AccountError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AccountError::EmailTaken,
        _ => AccountError::Database(e),
    }
}

/// Create a credential record for a new patient
pub async fn register(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<patient::Model, AccountError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AccountError::MissingCredentials);
    }

    if find_by_email(db, email).await?.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let password_hash = spawn_hash_password(password.to_string()).await?;
    let now = Utc::now();

    let patient = patient::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(map_unique_violation)?;

    info!("Registered patient {}", patient.id);
    Ok(patient)
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<patient::Model>, AccountError> {
    Ok(Patient::find_by_id(id).one(db).await?)
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<patient::Model>, AccountError> {
    Ok(Patient::find()
        .filter(patient::Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Replace a patient's password hash
pub async fn change_password(
    db: &DatabaseConnection,
    id: Uuid,
    new_password: &str,
) -> Result<patient::Model, AccountError> {
    if new_password.is_empty() {
        return Err(AccountError::EmptyPassword);
    }

    let patient = find_by_id(db, id).await?.ok_or(AccountError::NotFound)?;
    let password_hash = spawn_hash_password(new_password.to_string()).await?;

    let mut active: patient::ActiveModel = patient.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Password changed for patient {}", updated.id);
    Ok(updated)
}

/// Change a patient's login email, leaving the password hash untouched
pub async fn change_email(
    db: &DatabaseConnection,
    id: Uuid,
    new_email: &str,
) -> Result<patient::Model, AccountError> {
    let new_email = new_email.trim();
    if new_email.is_empty() {
        return Err(AccountError::EmptyEmail);
    }

    let patient = find_by_id(db, id).await?.ok_or(AccountError::NotFound)?;
    if patient.email == new_email {
        return Ok(patient);
    }

    let taken = Patient::find()
        .filter(patient::Column::Email.eq(new_email))
        .filter(patient::Column::Id.ne(id))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let mut active: patient::ActiveModel = patient.into();
    active.email = Set(new_email.to_string());
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await.map_err(map_unique_violation)?;
    info!("Email changed for patient {}", updated.id);
    Ok(updated)
}
