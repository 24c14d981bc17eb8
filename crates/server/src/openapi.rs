use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// `ADMIN` or `INVENTORY_MANAGER`.
#[derive(Serialize, ToSchema)]
pub struct RoleDoc(pub String);

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Option<RoleDoc>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest { pub current_password: String, pub new_password: String }

#[derive(ToSchema)]
pub struct UpdateRoleRequest { pub role: RoleDoc }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeUserDoc {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: RoleDoc,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::change_password,
        crate::routes::auth::update_role,
    ),
    components(
        schemas(
            HealthResponse,
            RoleDoc,
            RegisterRequest,
            LoginRequest,
            ChangePasswordRequest,
            UpdateRoleRequest,
            SafeUserDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth")
    )
)]
pub struct ApiDoc;
