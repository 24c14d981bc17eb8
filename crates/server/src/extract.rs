use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use service::auth::AuthError;

use crate::errors::ApiError;

/// `Json` body whose parse failures come back as a 400 in the usual error shape.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "request body rejected");
                Err(AuthError::Validation(rejection.body_text()).into())
            }
        }
    }
}
