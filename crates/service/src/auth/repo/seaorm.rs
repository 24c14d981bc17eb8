use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::domain::{NewUserRecord, Role, UserRecord};
use crate::auth::errors::AuthError;
use crate::auth::repository::CredentialStore;

pub struct SeaOrmCredentialStore {
    pub db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_record(m: models::user::Model) -> Result<UserRecord, AuthError> {
    let role: Role = m
        .role
        .parse()
        .map_err(|_| AuthError::Repository(format!("stored role {:?} is not recognised", m.role)))?;
    Ok(UserRecord {
        id: m.id,
        full_name: m.full_name,
        email: m.email,
        role,
        password_hash: m.password_hash,
        refresh_token_hash: m.refresh_token_hash,
        created_at: m.created_at.into(),
        updated_at: m.updated_at.into(),
    })
}

#[async_trait::async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        models::user::find_by_email(&self.db, email).await?.map(to_record).transpose()
    }

    async fn find_by_user_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        models::user::find_by_id(&self.db, id).await?.map(to_record).transpose()
    }

    async fn create(&self, record: NewUserRecord) -> Result<UserRecord, AuthError> {
        let created = models::user::create(
            &self.db,
            models::user::NewUser {
                full_name: &record.full_name,
                email: &record.email,
                password_hash: &record.password_hash,
                role: record.role.as_str(),
            },
        )
        .await?;
        to_record(created)
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AuthError> {
        Ok(models::user::set_refresh_token_hash(&self.db, id, hash).await?)
    }

    async fn swap_refresh_token_hash(&self, id: Uuid, expected: &str, next: String) -> Result<bool, AuthError> {
        Ok(models::user::swap_refresh_token_hash(&self.db, id, expected, next).await?)
    }

    async fn update_password_hash(&self, id: Uuid, hash: String) -> Result<bool, AuthError> {
        Ok(models::user::update_password_hash(&self.db, id, hash).await?)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<UserRecord>, AuthError> {
        models::user::update_role(&self.db, id, role.as_str()).await?.map(to_record).transpose()
    }
}
