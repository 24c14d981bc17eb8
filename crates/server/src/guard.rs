//! Request gates, run as middleware before the handler.
//!
//! `require_auth` resolves the caller from the `access_token` cookie, falling
//! back to `Authorization: Bearer`, and stores an [`AuthContext`] extension.
//! `require_roles` then checks that context against a per-route allow-list.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service::auth::{domain::Role, AuthError};
use uuid::Uuid;

use crate::cookies::ACCESS_COOKIE;
use crate::errors::ApiError;
use crate::routes::auth::ServerState;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Verified caller, available to handlers as `Extension<AuthContext>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

/// Cookie first, then bearer header. Empty values count as absent.
pub fn extract_access_token(jar: &CookieJar, req: &Request) -> Option<String> {
    if let Some(c) = jar.get(ACCESS_COOKIE) {
        if !c.value().is_empty() {
            return Some(c.value().to_string());
        }
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub async fn require_auth(
    State(state): State<ServerState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();
    let Some(token) = extract_access_token(&jar, &req) else {
        tracing::debug!(%path, "missing access token");
        return Err(AuthError::Unauthorized.into());
    };
    let claims = match state.sessions.authenticate(&token) {
        Ok(c) => c,
        Err(e) if e.is_internal() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(%path, err = %e, "access token rejected");
            return Err(AuthError::Unauthorized.into());
        }
    };
    req.extensions_mut().insert(AuthContext { user_id: claims.user_id, role: claims.role });
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`]; a missing context is `Unauthorized`.
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or(ApiError(AuthError::Unauthorized))?;
    if !allowed.contains(&ctx.role) {
        tracing::warn!(user_id = %ctx.user_id, role = %ctx.role, "role not permitted");
        return Err(AuthError::Forbidden.into());
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderMap;
    use axum_extra::extract::cookie::Cookie;

    fn request(auth: Option<&str>) -> Request {
        let mut b = Request::builder().uri("/auth/me");
        if let Some(a) = auth {
            b = b.header(AUTHORIZATION, a);
        }
        b.body(Body::empty()).unwrap()
    }

    #[test]
    fn cookie_wins_over_header() {
        let jar = CookieJar::from_headers(&HeaderMap::new()).add(Cookie::new(ACCESS_COOKIE, "from-cookie"));
        let req = request(Some("Bearer from-header"));
        assert_eq!(extract_access_token(&jar, &req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_header_is_the_fallback() {
        let jar = CookieJar::new();
        assert_eq!(extract_access_token(&jar, &request(Some("Bearer abc"))).as_deref(), Some("abc"));
        assert_eq!(extract_access_token(&jar, &request(Some("Basic abc"))), None);
        assert_eq!(extract_access_token(&jar, &request(Some("Bearer "))), None);
        assert_eq!(extract_access_token(&jar, &request(None)), None);
    }
}
