use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{NewUserRecord, Role, UserRecord};
use super::errors::AuthError;

/// Persistence the auth core needs from the account store.
///
/// Every read returns the full record, secrets included; stripping them is the
/// session manager's job.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;
    async fn find_by_user_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError>;

    /// Fails with `DuplicateEmail` when the email is taken.
    async fn create(&self, record: NewUserRecord) -> Result<UserRecord, AuthError>;

    /// Blind write; `None` ends the session.
    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AuthError>;

    /// Atomic conditional write: replaces the stored hash with `next` only if it
    /// still equals `expected`. Returns whether the swap happened.
    async fn swap_refresh_token_hash(&self, id: Uuid, expected: &str, next: String) -> Result<bool, AuthError>;

    /// Returns `false` if no such account exists.
    async fn update_password_hash(&self, id: Uuid, hash: String) -> Result<bool, AuthError>;
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<UserRecord>, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    pub struct MockCredentialStore {
        users: Mutex<HashMap<Uuid, UserRecord>>, // key: user id
    }

    impl MockCredentialStore {
        fn users(&self) -> Result<MutexGuard<'_, HashMap<Uuid, UserRecord>>, AuthError> {
            self.users.lock().map_err(|_| AuthError::Repository("mock store poisoned".into()))
        }

        pub fn len(&self) -> usize {
            self.users().map(|u| u.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl CredentialStore for MockCredentialStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
            let users = self.users()?;
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_user_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
            let users = self.users()?;
            Ok(users.get(&id).cloned())
        }

        async fn create(&self, record: NewUserRecord) -> Result<UserRecord, AuthError> {
            let mut users = self.users()?;
            if users.values().any(|u| u.email == record.email) {
                return Err(AuthError::DuplicateEmail);
            }
            let now = Utc::now();
            let user = UserRecord {
                id: Uuid::new_v4(),
                full_name: record.full_name,
                email: record.email,
                role: record.role,
                password_hash: record.password_hash,
                refresh_token_hash: None,
                created_at: now,
                updated_at: now,
            };
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AuthError> {
            let mut users = self.users()?;
            if let Some(u) = users.get_mut(&id) {
                u.refresh_token_hash = hash;
                u.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn swap_refresh_token_hash(&self, id: Uuid, expected: &str, next: String) -> Result<bool, AuthError> {
            let mut users = self.users()?;
            match users.get_mut(&id) {
                Some(u) if u.refresh_token_hash.as_deref() == Some(expected) => {
                    u.refresh_token_hash = Some(next);
                    u.updated_at = Utc::now();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn update_password_hash(&self, id: Uuid, hash: String) -> Result<bool, AuthError> {
            let mut users = self.users()?;
            Ok(match users.get_mut(&id) {
                Some(u) => {
                    u.password_hash = hash;
                    u.updated_at = Utc::now();
                    true
                }
                None => false,
            })
        }

        async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<UserRecord>, AuthError> {
            let mut users = self.users()?;
            Ok(users.get_mut(&id).map(|u| {
                u.role = role;
                u.updated_at = Utc::now();
                u.clone()
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn new_user(email: &str) -> NewUserRecord {
            NewUserRecord {
                full_name: "Test".into(),
                email: email.into(),
                role: Role::InventoryManager,
                password_hash: "hash".into(),
            }
        }

        #[tokio::test]
        async fn duplicate_email_rejected() {
            let store = MockCredentialStore::default();
            store.create(new_user("a@x.com")).await.unwrap();
            assert_eq!(store.create(new_user("a@x.com")).await, Err(AuthError::DuplicateEmail));
            assert_eq!(store.len(), 1);
        }

        #[tokio::test]
        async fn swap_requires_matching_expectation() {
            let store = MockCredentialStore::default();
            let u = store.create(new_user("b@x.com")).await.unwrap();
            // No session yet: nothing to swap from.
            assert!(!store.swap_refresh_token_hash(u.id, "h0", "h1".into()).await.unwrap());

            store.set_refresh_token_hash(u.id, Some("h1".into())).await.unwrap();
            assert!(store.swap_refresh_token_hash(u.id, "h1", "h2".into()).await.unwrap());
            assert!(!store.swap_refresh_token_hash(u.id, "h1", "h3".into()).await.unwrap());

            let now = store.find_by_user_id(u.id).await.unwrap().unwrap();
            assert_eq!(now.refresh_token_hash.as_deref(), Some("h2"));
        }

        #[tokio::test]
        async fn unknown_ids_are_reported() {
            let store = MockCredentialStore::default();
            let ghost = Uuid::new_v4();
            assert!(!store.update_password_hash(ghost, "x".into()).await.unwrap());
            assert!(store.update_role(ghost, Role::Admin).await.unwrap().is_none());
            store.set_refresh_token_hash(ghost, None).await.unwrap();
        }
    }
}
