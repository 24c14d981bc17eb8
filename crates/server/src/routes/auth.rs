use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::types::Success;
use service::auth::domain::{ChangePasswordInput, LoginInput, RegisterInput, Role, SafeUser};
use service::auth::repository::CredentialStore;
use service::auth::{AuthError, SessionManager};

use crate::cookies::{CookiePolicy, REFRESH_COOKIE};
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::guard::AuthContext;

pub type Sessions = SessionManager<dyn CredentialStore>;

#[derive(Clone)]
pub struct ServerState {
    pub sessions: Arc<Sessions>,
    pub cookies: CookiePolicy,
}

impl ServerState {
    pub fn new(sessions: Arc<Sessions>, cookies: CookiePolicy) -> Self {
        Self { sessions, cookies }
    }
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: SafeUser,
}

#[derive(Deserialize)]
pub struct UpdateRoleInput {
    pub role: Role,
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered", body = crate::openapi::SafeUserDoc), (status = 400, description = "Validation failed or email already in use"), (status = 401, description = "Unauthorized"), (status = 403, description = "Forbidden")))]
pub async fn register(
    State(state): State<ServerState>,
    Extension(actor): Extension<AuthContext>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, Json<SafeUser>), ApiError> {
    let user = state.sessions.register(actor.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in; access_token and refresh_token cookies set"), (status = 401, description = "Invalid credentials")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), ApiError> {
    let outcome = state.sessions.login(input).await?;
    let jar = state.cookies.set_session(jar, &outcome.tokens);
    Ok((jar, Json(LoginOutput { user: outcome.user })))
}

#[utoipa::path(post, path = "/auth/refresh", tag = "auth", responses((status = 200, description = "Both cookies rotated"), (status = 401, description = "Missing, invalid or expired refresh token")))]
pub async fn refresh(
    State(state): State<ServerState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Success>), ApiError> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError(AuthError::Unauthorized))?;
    let tokens = state.sessions.refresh(&presented).await?;
    let jar = state.cookies.set_session(jar, &tokens);
    Ok((jar, Json(Success::ok())))
}

#[utoipa::path(post, path = "/auth/logout", tag = "auth", responses((status = 200, description = "Session closed; cookies cleared"), (status = 401, description = "Unauthorized")))]
pub async fn logout(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Success>), ApiError> {
    state.sessions.logout(ctx.user_id).await?;
    Ok((state.cookies.clear_session(jar), Json(Success::ok())))
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", responses((status = 200, description = "Current user", body = crate::openapi::SafeUserDoc), (status = 401, description = "Unauthorized")))]
pub async fn me(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<SafeUser>, ApiError> {
    Ok(Json(state.sessions.me(ctx.user_id).await?))
}

#[utoipa::path(post, path = "/auth/password", tag = "auth", request_body = crate::openapi::ChangePasswordRequest, responses((status = 200, description = "Password changed; session closed"), (status = 401, description = "Current password wrong or not authenticated")))]
pub async fn change_password(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
    ApiJson(input): ApiJson<ChangePasswordInput>,
) -> Result<(CookieJar, Json<Success>), ApiError> {
    state.sessions.change_password(ctx.user_id, input).await?;
    Ok((state.cookies.clear_session(jar), Json(Success::ok())))
}

#[utoipa::path(put, path = "/auth/users/{id}/role", tag = "auth", params(("id" = Uuid, Path, description = "Account id")), request_body = crate::openapi::UpdateRoleRequest, responses((status = 200, description = "Role updated", body = crate::openapi::SafeUserDoc), (status = 403, description = "Forbidden"), (status = 404, description = "User not found")))]
pub async fn update_role(
    State(state): State<ServerState>,
    Extension(actor): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<UpdateRoleInput>,
) -> Result<Json<SafeUser>, ApiError> {
    Ok(Json(state.sessions.update_role(actor.user_id, id, input.role).await?))
}
