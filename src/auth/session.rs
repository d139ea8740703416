use axum::http::{header, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Fresh random session key, 64 hex characters.
pub fn generate_session_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Sessions are stored under this digest, never the raw key.
pub fn digest_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// CSRF token bound to a session key. Only the key holder can derive it, so
/// unsafe requests must echo it back in the `X-CSRFToken` header.
pub fn csrf_token(key: &str) -> String {
    format!("{:x}", Sha256::digest(format!("csrf:{}", key).as_bytes()))
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

pub fn set_session_cookie(key: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE, key, max_age_secs, secure
    ))
    .ok()
}

/// Readable by page scripts, unlike the session cookie.
pub fn set_csrf_cookie(token: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; SameSite=Lax; Path=/{}",
        CSRF_COOKIE, token, max_age_secs, secure
    ))
    .ok()
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static(
            "sessionid=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/; Secure",
        )
    } else {
        HeaderValue::from_static(
            "sessionid=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        )
    }
}
