use thiserror::Error;

/// Business errors for auth workflows.
///
/// `InvalidCredentials` and `InvalidToken` deliberately carry no detail so callers
/// cannot tell an unknown email from a wrong password, or a forged token from a
/// rotated-out one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already in use")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no active session, please login")]
    NoActiveSession,
    #[error("invalid token")]
    InvalidToken,
    #[error("malformed token")]
    MalformedToken,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("user not found")]
    NotFound,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::DuplicateEmail => 1002,
            AuthError::NotFound => 1003,
            AuthError::InvalidCredentials => 1004,
            AuthError::NoActiveSession => 1005,
            AuthError::InvalidToken => 1006,
            AuthError::MalformedToken => 1007,
            AuthError::Unauthorized => 1008,
            AuthError::Forbidden => 1009,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }

    /// Store or crypto failure; detail must not reach clients.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_))
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(err: models::errors::ModelError) -> Self {
        match err {
            models::errors::ModelError::Validation(msg) => AuthError::Validation(msg),
            models::errors::ModelError::Duplicate(_) => AuthError::DuplicateEmail,
            models::errors::ModelError::Db(msg) => AuthError::Repository(msg),
        }
    }
}
