//! Session cookie pair: `access_token` + `refresh_token`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use configs::Environment;
use service::auth::token::{TokenPair, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Production: `Secure; SameSite=None` for a cross-site frontend.
    /// Development: plain HTTP with `SameSite=Lax`.
    pub fn for_environment(env: Environment) -> Self {
        if env.is_production() {
            Self { secure: true, same_site: SameSite::None }
        } else {
            Self { secure: false, same_site: SameSite::Lax }
        }
    }

    fn cookie(&self, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    /// Write both tokens; lifetimes match the tokens' own.
    pub fn set_session(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE, tokens.access_token.clone(), ACCESS_TOKEN_TTL_SECS))
            .add(self.cookie(REFRESH_COOKIE, tokens.refresh_token.clone(), REFRESH_TOKEN_TTL_SECS))
    }

    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
            .remove(Cookie::build(REFRESH_COOKIE).path("/"))
    }
}
