//! SeaORM-backed credential lookup

use async_trait::async_trait;
use portal_auth::{CredentialRecord, CredentialStore, StoreError};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{patient, Patient};

#[derive(Clone)]
pub struct SeaOrmCredentialStore {
    db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<patient::Model> for CredentialRecord {
    fn from(model: patient::Model) -> Self {
        Self {
            id: model.id.to_string(),
            email: model.email,
            password_hash: model.password_hash,
        }
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let patient = Patient::find()
            .filter(patient::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(patient.map(CredentialRecord::from))
    }
}
