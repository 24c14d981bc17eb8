use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::AuthError;
use tracing::error;

/// HTTP face of [`AuthError`].
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AuthError::Validation(_) | AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::NoActiveSession
            | AuthError::InvalidToken
            | AuthError::MalformedToken
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = if self.0.is_internal() {
            error!(error = %self.0, code = self.0.code(), "internal auth failure");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(serde_json::json!({"error": msg, "code": self.0.code()}))).into_response()
    }
}
