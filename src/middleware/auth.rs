use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::auth::{csrf_token, parse_authorization, parse_cookie, Credentials, CSRF_HEADER, SESSION_COOKIE};
use crate::error::ApiError;
use crate::policy::{Action, AuthScheme, PolicyError, Principal};
use crate::services::AccountError;
use crate::state::AppState;

/// Middleware state for a group of routes sharing the same accepted schemes.
#[derive(Clone)]
pub struct AuthGate {
    pub state: AppState,
    pub schemes: &'static [AuthScheme],
}

impl AuthGate {
    /// Gate with the schemes `action` accepts.
    pub fn for_action(state: AppState, action: Action) -> Self {
        Self {
            state,
            schemes: action.schemes(),
        }
    }
}

/// Resolve the principal using the accepted schemes, tried in order.
///
/// `Ok(None)` means no usable credentials were presented. A stale session
/// cookie counts as absent. Bad Basic or Bearer credentials are rejected
/// with a challenge for that scheme, but only once an earlier scheme has
/// failed to resolve a principal, so a live session wins over a junk
/// `Authorization` header.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    schemes: &'static [AuthScheme],
) -> Result<Option<Principal>, ApiError> {
    let credentials = parse_authorization(headers);
    let accounts = state.accounts();

    for scheme in schemes {
        match (scheme, &credentials) {
            (AuthScheme::Session, _) => {
                if let Some(key) = parse_cookie(headers, SESSION_COOKIE) {
                    if let Some(principal) = accounts.principal_from_session(&key).await? {
                        return Ok(Some(principal));
                    }
                }
            }
            (AuthScheme::Basic | AuthScheme::Token, Err(e)) => {
                tracing::warn!("Rejected Authorization header: {}", e);
                return Err(ApiError::unauthorized_with(e.to_string(), *scheme));
            }
            (AuthScheme::Basic, Ok(Some(Credentials::Basic { username, password }))) => {
                let user = accounts
                    .verify_credentials(username, password)
                    .await
                    .map_err(|e| challenge(e, AuthScheme::Basic))?;
                return Ok(Some(accounts.principal_for(&user, AuthScheme::Basic).await?));
            }
            (AuthScheme::Token, Ok(Some(Credentials::Bearer(token)))) => {
                let principal = accounts
                    .principal_from_token(token)
                    .await
                    .map_err(|e| challenge(e, AuthScheme::Token))?;
                return Ok(Some(principal));
            }
            _ => {}
        }
    }

    Ok(None)
}

/// Session-authenticated requests with an unsafe method must echo the
/// session's CSRF token. Basic and Bearer requests are exempt.
pub fn enforce_csrf(method: &Method, headers: &HeaderMap, principal: &Principal) -> Result<(), ApiError> {
    if principal.scheme != AuthScheme::Session || method.is_safe() {
        return Ok(());
    }

    let expected = parse_cookie(headers, SESSION_COOKIE).map(|key| csrf_token(&key));
    let provided = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (provided, expected) {
        (None, _) => Err(ApiError::forbidden("CSRF Failed: CSRF token missing.")),
        (Some(provided), Some(expected)) if provided == expected => Ok(()),
        _ => {
            tracing::warn!("CSRF token mismatch for '{}'", principal.username);
            Err(ApiError::forbidden("CSRF Failed: CSRF token incorrect."))
        }
    }
}

fn challenge(err: AccountError, scheme: AuthScheme) -> ApiError {
    match ApiError::from(err) {
        ApiError::Unauthorized { message, .. } => ApiError::unauthorized_with(message, scheme),
        other => other,
    }
}

/// Reject the request unless a principal can be resolved; otherwise hand it
/// to the handler as an `Extension<Principal>`.
pub async fn require_principal(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(&gate.state, request.headers(), gate.schemes)
        .await?
        .ok_or(PolicyError::NotAuthenticated { accepted: gate.schemes })?;
    enforce_csrf(request.method(), request.headers(), &principal)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
