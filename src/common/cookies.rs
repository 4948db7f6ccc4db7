// src/common/cookies.rs
//! Cookie header helpers for the auth and session cookies

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use std::time::Duration;
use tracing::error;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const SESSION_COOKIE: &str = "lms_session";

/// Build an `HttpOnly; SameSite=Lax` cookie scoped to `/`.
///
/// `Lax` keeps the cookie on the top-level redirect back from Google while
/// still refusing it on cross-site sub-requests.
pub fn build_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Expire a cookie. `secure` must match how it was set.
pub fn expired_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(name, "", Duration::ZERO, secure)
}

/// Append a `Set-Cookie` header, logging instead of failing when the value
/// cannot be encoded.
pub fn append_cookie(headers: &mut HeaderMap, cookie: Result<HeaderValue, InvalidHeaderValue>) {
    match cookie {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => error!(error = %e, "Failed to encode Set-Cookie header"),
    }
}

/// Expire both token cookies.
///
/// `ApiError` responses carry no config, so these go out without `Secure`.
pub fn clear_auth_cookies(headers: &mut HeaderMap) {
    append_cookie(headers, expired_cookie(ACCESS_TOKEN_COOKIE, false));
    append_cookie(headers, expired_cookie(REFRESH_TOKEN_COOKIE, false));
}

/// Read a cookie value from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
        .find(|value| !value.is_empty())
}
