use std::sync::Arc;

use async_trait::async_trait;
use service::auth::domain::{LoginInput, NewUserRecord, RegisterInput, Role, UserRecord};
use service::auth::password::{HashCost, SecretHasher};
use service::auth::repository::{mock::MockCredentialStore, CredentialStore};
use service::auth::token::TokenIssuer;
use service::auth::{AuthError, SessionManager};
use uuid::Uuid;

fn sessions() -> (Arc<MockCredentialStore>, SessionManager<MockCredentialStore>) {
    let repo = Arc::new(MockCredentialStore::default());
    let hasher = SecretHasher::new(HashCost::minimal()).expect("hasher");
    let tokens = TokenIssuer::new("lifecycle-access", "lifecycle-refresh").expect("issuer");
    let svc = SessionManager::new(repo.clone(), hasher, tokens).expect("manager");
    (repo, svc)
}

/// Yields right after every account read, so concurrent callers all read
/// before any of them writes.
struct YieldingStore {
    inner: MockCredentialStore,
}

#[async_trait]
impl CredentialStore for YieldingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let found = self.inner.find_by_email(email).await;
        tokio::task::yield_now().await;
        found
    }

    async fn find_by_user_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        let found = self.inner.find_by_user_id(id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn create(&self, record: NewUserRecord) -> Result<UserRecord, AuthError> {
        self.inner.create(record).await
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AuthError> {
        self.inner.set_refresh_token_hash(id, hash).await
    }

    async fn swap_refresh_token_hash(&self, id: Uuid, expected: &str, next: String) -> Result<bool, AuthError> {
        self.inner.swap_refresh_token_hash(id, expected, next).await
    }

    async fn update_password_hash(&self, id: Uuid, hash: String) -> Result<bool, AuthError> {
        self.inner.update_password_hash(id, hash).await
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<UserRecord>, AuthError> {
        self.inner.update_role(id, role).await
    }
}

fn login(email: &str, password: &str) -> LoginInput {
    LoginInput { email: email.into(), password: password.into() }
}

#[tokio::test]
async fn full_session_scenario() {
    let (_, svc) = sessions();
    let admin = svc
        .register(
            Uuid::new_v4(),
            RegisterInput { full_name: "Admin".into(), email: "a@x.com".into(), password: "pw1".into(), role: Some(Role::Admin) },
        )
        .await
        .expect("register");

    let t1 = svc.login(login("a@x.com", "pw1")).await.expect("login").tokens;

    let t2 = svc.refresh(&t1.refresh_token).await.expect("first refresh");
    assert_ne!(t2.access_token, t1.access_token);
    assert_ne!(t2.refresh_token, t1.refresh_token);

    assert_eq!(svc.refresh(&t1.refresh_token).await, Err(AuthError::InvalidToken));

    svc.logout(admin.id).await.expect("logout");
    assert_eq!(svc.refresh(&t2.refresh_token).await, Err(AuthError::NoActiveSession));
}

#[tokio::test]
async fn login_failures_look_identical() {
    let (_, svc) = sessions();
    svc.register(
        Uuid::new_v4(),
        RegisterInput { full_name: "Clerk".into(), email: "clerk@x.com".into(), password: "right".into(), role: None },
    )
    .await
    .expect("register");

    let wrong_password = svc.login(login("clerk@x.com", "wrong")).await.unwrap_err();
    let unknown_email = svc.login(login("ghost@x.com", "right")).await.unwrap_err();
    assert_eq!(wrong_password, AuthError::InvalidCredentials);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(wrong_password.code(), unknown_email.code());
}

#[tokio::test]
async fn duplicate_registration_leaves_original_untouched() {
    let (repo, svc) = sessions();
    let first = svc
        .register(
            Uuid::new_v4(),
            RegisterInput { full_name: "First".into(), email: "dup@x.com".into(), password: "one".into(), role: None },
        )
        .await
        .expect("register");
    let before = repo.find_by_user_id(first.id).await.unwrap().unwrap();

    let err = svc
        .register(
            Uuid::new_v4(),
            RegisterInput { full_name: "Second".into(), email: "DUP@x.com".into(), password: "two".into(), role: Some(Role::Admin) },
        )
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::DuplicateEmail);

    let after = repo.find_by_user_id(first.id).await.unwrap().unwrap();
    assert_eq!(before, after);
    assert_eq!(repo.len(), 1);
    assert!(svc.login(login("dup@x.com", "one")).await.is_ok());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (_, svc) = sessions();
    let user = svc
        .register(
            Uuid::new_v4(),
            RegisterInput { full_name: "U".into(), email: "u@x.com".into(), password: "pw".into(), role: None },
        )
        .await
        .unwrap();
    svc.logout(user.id).await.unwrap();
    svc.logout(user.id).await.unwrap();
    svc.logout(Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn concurrent_refresh_with_same_token_issues_at_most_one_pair() {
    let (_, svc) = sessions();
    svc.register(
        Uuid::new_v4(),
        RegisterInput { full_name: "Racer".into(), email: "race@x.com".into(), password: "pw".into(), role: None },
    )
    .await
    .unwrap();
    let t1 = svc.login(login("race@x.com", "pw")).await.unwrap().tokens;

    let (a, b) = tokio::join!(svc.refresh(&t1.refresh_token), svc.refresh(&t1.refresh_token));
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = if a.is_ok() { b } else { a };
    assert_eq!(loser.unwrap_err(), AuthError::InvalidToken);
}

#[tokio::test]
async fn interleaved_refreshes_are_settled_by_the_conditional_write() {
    let repo = Arc::new(YieldingStore { inner: MockCredentialStore::default() });
    let hasher = SecretHasher::new(HashCost::minimal()).expect("hasher");
    let tokens = TokenIssuer::new("lifecycle-access", "lifecycle-refresh").expect("issuer");
    let svc = SessionManager::new(repo.clone(), hasher, tokens).expect("manager");
    let user = svc
        .register(
            Uuid::new_v4(),
            RegisterInput { full_name: "Twin".into(), email: "twin@x.com".into(), password: "pw".into(), role: None },
        )
        .await
        .unwrap();
    let t1 = svc.login(login("twin@x.com", "pw")).await.unwrap().tokens;

    // Both calls read the same stored hash and both pass the hash check;
    // only the conditional write can tell them apart.
    let (a, b) = tokio::join!(svc.refresh(&t1.refresh_token), svc.refresh(&t1.refresh_token));
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let (winner, loser) = if a.is_ok() { (a, b) } else { (b, a) };
    assert_eq!(loser.unwrap_err(), AuthError::InvalidToken);

    // The stored fingerprint belongs to the winner's token, so it keeps working.
    let winner = winner.unwrap();
    let stored = repo.inner.find_by_user_id(user.id).await.unwrap().unwrap();
    assert!(stored.has_active_session());
    assert!(svc.refresh(&winner.refresh_token).await.is_ok());
}
