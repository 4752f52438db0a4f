use crate::errors::AppError;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::Duration;

pub const TOKEN_COOKIE: &str = "token";

/// 10e10 ms, i.e. the session never expires on its own.
const TOKEN_MAX_AGE: Duration = Duration::seconds(100_000_000);

pub fn token(jar: &CookieJar) -> Option<String> {
    jar.get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub fn require_token(jar: &CookieJar) -> Result<String, AppError> {
    token(jar).ok_or_else(|| AppError::unauthorized("session token missing"))
}

pub fn with_token(jar: CookieJar, token: impl Into<String>) -> CookieJar {
    jar.add(
        Cookie::build((TOKEN_COOKIE, token.into()))
            .path("/")
            .max_age(TOKEN_MAX_AGE),
    )
}

/// Always emits a removal cookie, whether or not the client sent one.
pub fn without_token(jar: CookieJar) -> CookieJar {
    let mut removal = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    removal.make_removal();
    jar.add(removal)
}
