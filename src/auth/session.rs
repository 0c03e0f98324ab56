//! Session cookie handling.
//!
//! Browsers carry the session token in an HttpOnly cookie; API clients may send the
//! same token as `Authorization: Bearer <token>`.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

use super::token::TOKEN_TTL_HOURS;

pub const SESSION_COOKIE: &str = "session";

/// Builds the cookie set on successful login.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(TOKEN_TTL_HOURS))
        .finish()
}

/// Builds a cookie that makes the browser drop the session.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .finish()
}

/// Picks the session token from a request. The `Authorization` header wins over the cookie.
pub fn select_token(authorization: Option<&str>, cookie_value: Option<&str>) -> Option<String> {
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_value.filter(|token| !token.is_empty()))
        .map(str::to_owned)
}
