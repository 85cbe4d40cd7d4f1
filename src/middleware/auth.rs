//! Authentication middleware.
//!
//! Three flavours, all resolving credentials before the handler runs:
//! - `auth_middleware`: bearer token required, injects [`AuthContext`]
//! - `optional_auth_middleware`: bearer token optional, injects [`OptionalAuth`]
//! - `admin_middleware`: `X-Admin-Token` must match the configured admin token

use crate::{app::AppState, error::AppError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Header carrying the administrator capability.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Authentication context attached to authenticated requests.
///
/// Route handlers extract it with `Extension<AuthContext>` to know which
/// user made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Buyer identity on checkout routes. `None` for guests.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthContext>);

/// SHA-256 of a token, hex encoded. Tokens are only ever stored and compared
/// in this form.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bearer token authentication.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the token using SHA-256
/// 3. Look up an active token with that hash
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = resolve_bearer(&state, request.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth);

    Ok(next.run(request).await)
}

/// Like [`auth_middleware`], but a request without an `Authorization` header
/// passes through as a guest. A header that is present but invalid is still
/// rejected.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = resolve_bearer(&state, request.headers()).await?;

    request.extensions_mut().insert(OptionalAuth(auth));

    Ok(next.run(request).await)
}

/// Administrator gate. Every request is rejected when no admin token is
/// configured.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .admin_token_hash
        .as_deref()
        .ok_or(AppError::Unauthorized)?;

    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if hash_token(presented) != expected {
        tracing::warn!("Rejected admin token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// `Ok(None)` when no `Authorization` header was sent at all.
async fn resolve_bearer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AppError> {
    let Some(header) = headers.get("Authorization") else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let user_id = state
        .store
        .find_user_by_token_hash(&hash_token(token))
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Some(AuthContext { user_id }))
}
