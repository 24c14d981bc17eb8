use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AuthError;
use super::token::TokenPair;

/// Account role. Serialized in SCREAMING_SNAKE_CASE both in tokens and in storage.
/// Registration without an explicit role yields `InventoryManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    InventoryManager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::InventoryManager => "INVENTORY_MANAGER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "INVENTORY_MANAGER" => Ok(Role::InventoryManager),
            other => Err(AuthError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Full account record as held by the credential store, secrets included.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    /// `None` means no active session.
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn to_safe(&self) -> SafeUser {
        SafeUser {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn has_active_session(&self) -> bool {
        self.refresh_token_hash.is_some()
    }
}

// Secrets never reach log output.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("active_session", &self.has_active_session())
            .finish_non_exhaustive()
    }
}

/// Insert payload handed to the credential store.
#[derive(Clone)]
pub struct NewUserRecord {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Safe projection: what leaves the auth core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration input
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login input
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Successful login: the safe user plus a freshly minted token pair.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: SafeUser,
    pub tokens: TokenPair,
}

/// Lookup key normalization; uniqueness is case-insensitive.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
