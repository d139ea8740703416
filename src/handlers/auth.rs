use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::AppendHeaders,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{
    clear_session_cookie, csrf_token, parse_cookie, set_csrf_cookie, set_session_cookie, SESSION_COOKIE,
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{authorize, Action, AuthScheme, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

type WithCookie = ([(HeaderName, HeaderValue); 1], ApiResponse<Value>);

pub(crate) type SessionCookies = AppendHeaders<[(HeaderName, HeaderValue); 2]>;

/// `Set-Cookie` headers for a fresh session: the HttpOnly session key and
/// the script-readable CSRF token bound to it.
pub(crate) fn session_cookies(state: &AppState, key: &str) -> Result<SessionCookies, ApiError> {
    let max_age = state.config.security.session_expiry_hours * 3600;
    let secure = state.config.security.secure_cookies;
    let session = set_session_cookie(key, max_age, secure);
    let csrf = set_csrf_cookie(&csrf_token(key), max_age, secure);
    match (session, csrf) {
        (Some(session), Some(csrf)) => Ok(AppendHeaders([
            (header::SET_COOKIE, session),
            (header::SET_COOKIE, csrf),
        ])),
        _ => Err(ApiError::internal_server_error("Failed to build session cookie")),
    }
}

/**
 * POST /api/auth/login - Start a cookie session
 *
 * Expected Output (Success):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "user": { "user_id": 1, "username": "admin", "is_superuser": true, "permissions": [], "scheme": "session" },
 *     "csrf_token": "9f86d081884c7d65...",
 *     "expires_in": 1209600
 *   }
 * }
 * ```
 *
 * The raw session key only ever travels in the `Set-Cookie` header. Unsafe
 * requests made with the session must send `csrf_token` as `X-CSRFToken`.
 */
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(SessionCookies, ApiResponse<Value>), ApiError> {
    let Json(request) = body?;
    let accounts = state.accounts();

    let user = accounts.verify_credentials(&request.username, &request.password).await?;
    let key = accounts.open_session(&user).await?;
    let principal = accounts.principal_for(&user, AuthScheme::Session).await?;

    let cookies = session_cookies(&state, &key)?;

    info!("User '{}' logged in", user.username);
    Ok((
        cookies,
        ApiResponse::success(json!({
            "user": principal,
            "csrf_token": csrf_token(&key),
            "expires_in": state.config.security.session_expiry_hours * 3600,
        })),
    ))
}

/**
 * POST /api/auth/token - Exchange credentials for a bearer token
 *
 * Expected Output (Success):
 * ```json
 * {
 *   "success": true,
 *   "data": { "token": "eyJhbGciOiJIUzI1NiI...", "token_type": "Bearer", "expires_in": 604800 }
 * }
 * ```
 */
pub async fn token(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = body?;
    let accounts = state.accounts();

    let user = accounts.verify_credentials(&request.username, &request.password).await?;
    let token = accounts.issue_token(&user)?;

    info!("Issued token for '{}'", user.username);
    Ok(ApiResponse::success(json!({
        "token": token,
        "token_type": "Bearer",
        "expires_in": state.config.security.jwt_expiry_hours * 3600,
    })))
}

/// POST /api/auth/logout - session authentication
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Result<WithCookie, ApiError> {
    authorize(Action::Logout, Some(&principal))?;
    if let Some(key) = parse_cookie(&headers, SESSION_COOKIE) {
        state.accounts().close_session(&key).await?;
    }

    info!("User '{}' logged out", principal.username);
    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.config.security.secure_cookies))],
        ApiResponse::success(json!({ "message": "Logged out successfully" })),
    ))
}

/// GET /api/auth/whoami - the resolved principal, any scheme
pub async fn whoami(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    authorize(Action::Whoami, Some(&principal))?;
    Ok(ApiResponse::success(principal))
}
