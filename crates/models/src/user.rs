use sea_orm::{entity::prelude::*, sea_query::Expr, DatabaseConnection, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub full_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fields required to insert an account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > 255 {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_full_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("full name required".into()));
    }
    if name.len() > 128 {
        return Err(ModelError::Validation("full name too long (<=128)".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, new: NewUser<'_>) -> Result<Model, ModelError> {
    validate_email(new.email)?;
    validate_full_name(new.full_name)?;
    if new.password_hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        full_name: Set(new.full_name.to_string()),
        email: Set(new.email.to_string()),
        password_hash: Set(new.password_hash.to_string()),
        role: Set(new.role.to_string()),
        refresh_token_hash: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email)).one(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Unconditional write of the session fingerprint; `None` ends the session.
pub async fn set_refresh_token_hash(db: &DatabaseConnection, id: Uuid, hash: Option<String>) -> Result<(), ModelError> {
    Entity::update_many()
        .col_expr(Column::RefreshTokenHash, Expr::value(hash))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Compare-and-swap of the session fingerprint in a single UPDATE.
///
/// Returns `true` only when the stored hash still equalled `expected`.
pub async fn swap_refresh_token_hash(
    db: &DatabaseConnection,
    id: Uuid,
    expected: &str,
    next: String,
) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::RefreshTokenHash, Expr::value(Some(next)))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .filter(Column::RefreshTokenHash.eq(expected))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

pub async fn update_password_hash(db: &DatabaseConnection, id: Uuid, hash: String) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::PasswordHash, Expr::value(hash))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

pub async fn update_role(db: &DatabaseConnection, id: Uuid, role: &str) -> Result<Option<Model>, ModelError> {
    let Some(found) = Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut am: ActiveModel = found.into();
    am.role = Set(role.to_string());
    am.updated_at = Set(Utc::now().into());
    Ok(Some(am.update(db).await?))
}
