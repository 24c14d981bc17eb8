use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{
    normalize_email, ChangePasswordInput, LoginInput, LoginOutcome, NewUserRecord, RegisterInput, Role, SafeUser,
};
use super::errors::AuthError;
use super::password::SecretHasher;
use super::repository::CredentialStore;
use super::token::{AccessClaims, TokenIssuer, TokenKind, TokenPair};

/// Session lifecycle over a credential store.
///
/// An account is either in NoSession (`refresh_token_hash` is `None`) or Active
/// (`Some(hash)`). `login` enters Active, `refresh` rotates within Active,
/// `logout` and `change_password` return to NoSession.
pub struct SessionManager<R: CredentialStore + ?Sized> {
    repo: Arc<R>,
    hasher: SecretHasher,
    tokens: TokenIssuer,
    // Verified against when the email is unknown, so both login failures cost the same.
    decoy_digest: String,
}

impl<R: CredentialStore + ?Sized> SessionManager<R> {
    pub fn new(repo: Arc<R>, hasher: SecretHasher, tokens: TokenIssuer) -> Result<Self, AuthError> {
        let decoy_digest = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self { repo, hasher, tokens, decoy_digest })
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_secret(&self, secret: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AuthError::HashError(e.to_string()))?
    }

    async fn verify_secret(&self, secret: String, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &digest))
            .await
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    /// Create an account in NoSession state. The caller must already have been
    /// checked for the ADMIN role.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{SessionManager, repository::{CredentialStore, mock::MockCredentialStore}};
    /// use service::auth::{domain::{RegisterInput, Role}, password::{HashCost, SecretHasher}, token::TokenIssuer};
    /// use std::sync::Arc;
    /// let repo: Arc<dyn CredentialStore> = Arc::new(MockCredentialStore::default());
    /// let hasher = SecretHasher::new(HashCost::minimal()).unwrap();
    /// let tokens = TokenIssuer::new("access-secret", "refresh-secret").unwrap();
    /// let sessions = SessionManager::new(repo, hasher, tokens).unwrap();
    /// let input = RegisterInput { full_name: "Stock Keeper".into(), email: "keeper@erp.local".into(), password: "pw1".into(), role: None };
    /// let user = tokio_test::block_on(sessions.register(uuid::Uuid::new_v4(), input)).unwrap();
    /// assert_eq!(user.role, Role::InventoryManager);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, actor_id: Uuid, input: RegisterInput) -> Result<SafeUser, AuthError> {
        let email = normalize_email(&input.email);
        validate_registration(&input.full_name, &email, &input.password)?;

        if self.repo.find_by_email(&email).await?.is_some() {
            debug!("email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_secret(input.password.clone()).await?;
        let created = self
            .repo
            .create(NewUserRecord {
                full_name: input.full_name.trim().to_string(),
                email,
                role: input.role.unwrap_or_default(),
                password_hash,
            })
            .await?;
        info!(user_id = %created.id, %actor_id, role = %created.role, "user_registered");
        Ok(created.to_safe())
    }

    /// Verify credentials and open a session, replacing any previous one.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(&input.email);
        let Some(user) = self.repo.find_by_email(&email).await? else {
            let _ = self.verify_secret(input.password.clone(), self.decoy_digest.clone()).await?;
            warn!("login_failed");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.verify_secret(input.password.clone(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login_failed");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.issue(user.id, user.role)?;
        let fingerprint = self.hash_secret(tokens.refresh_token.clone()).await?;
        self.repo.set_refresh_token_hash(user.id, Some(fingerprint)).await?;
        info!(user_id = %user.id, "login_succeeded");
        Ok(LoginOutcome { user: user.to_safe(), tokens })
    }

    /// Rotate: trade a live refresh token for a new pair. The presented token
    /// is dead afterwards, whether or not the caller keeps the new one.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.verify(presented, TokenKind::Refresh)?;
        let user = self
            .repo
            .find_by_user_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        let Some(stored) = user.refresh_token_hash.as_deref() else {
            debug!(user_id = %user.id, "refresh_rejected: no active session");
            return Err(AuthError::NoActiveSession);
        };
        if !self.verify_secret(presented.to_string(), stored.to_string()).await? {
            warn!(user_id = %user.id, "refresh_rejected: token does not match the active session");
            return Err(AuthError::InvalidToken);
        }

        let tokens = self.tokens.issue(user.id, user.role)?;
        let fingerprint = self.hash_secret(tokens.refresh_token.clone()).await?;
        if !self.repo.swap_refresh_token_hash(user.id, stored, fingerprint).await? {
            // Another refresh or a logout got there first.
            warn!(user_id = %user.id, "refresh_rejected: session changed concurrently");
            return Err(AuthError::InvalidToken);
        }
        info!(user_id = %user.id, "session_rotated");
        Ok(tokens)
    }

    /// Idempotent.
    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.repo.set_refresh_token_hash(user_id, None).await?;
        info!(%user_id, "session_closed");
        Ok(())
    }

    /// Identity behind an access token, for request guards.
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        self.tokens.verify_access(access_token)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<SafeUser, AuthError> {
        self.repo
            .find_by_user_id(user_id)
            .await?
            .map(|u| u.to_safe())
            .ok_or(AuthError::NotFound)
    }

    /// Replace the password and end the current session.
    #[instrument(skip(self, input))]
    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordInput) -> Result<(), AuthError> {
        if input.new_password.is_empty() {
            return Err(AuthError::Validation("new password required".into()));
        }
        let user = self.repo.find_by_user_id(user_id).await?.ok_or(AuthError::NotFound)?;
        if !self.verify_secret(input.current_password.clone(), user.password_hash.clone()).await? {
            return Err(AuthError::InvalidCredentials);
        }
        let hash = self.hash_secret(input.new_password.clone()).await?;
        if !self.repo.update_password_hash(user_id, hash).await? {
            return Err(AuthError::NotFound);
        }
        self.repo.set_refresh_token_hash(user_id, None).await?;
        info!(%user_id, "password_changed");
        Ok(())
    }

    /// Takes effect on the next login or refresh; outstanding access tokens keep
    /// the old role until they expire.
    #[instrument(skip(self))]
    pub async fn update_role(&self, actor_id: Uuid, user_id: Uuid, role: Role) -> Result<SafeUser, AuthError> {
        let updated = self.repo.update_role(user_id, role).await?.ok_or(AuthError::NotFound)?;
        info!(%actor_id, %user_id, %role, "role_updated");
        Ok(updated.to_safe())
    }

    /// Create the bootstrap ADMIN if the email is free. `None` when it already exists.
    #[instrument(skip(self, password))]
    pub async fn seed_admin(&self, email: &str, password: &str, full_name: &str) -> Result<Option<SafeUser>, AuthError> {
        let email = normalize_email(email);
        validate_registration(full_name, &email, password)?;
        if self.repo.find_by_email(&email).await?.is_some() {
            debug!("bootstrap admin already present");
            return Ok(None);
        }
        let created = self
            .repo
            .create(NewUserRecord {
                full_name: full_name.trim().to_string(),
                email,
                role: Role::Admin,
                password_hash: self.hash_secret(password.to_string()).await?,
            })
            .await?;
        info!(user_id = %created.id, "admin_seeded");
        Ok(Some(created.to_safe()))
    }
}

fn validate_registration(full_name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    models::user::validate_email(email)?;
    models::user::validate_full_name(full_name)?;
    if password.is_empty() {
        return Err(AuthError::Validation("password required".into()));
    }
    Ok(())
}
