use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

/// Identity of the caller, taken from a verified Firebase ID token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)?;

    let identity = state.identity.verify(&token).await.map_err(|e| {
        tracing::debug!(error = %e, "ID token rejected");
        AppError::Unauthorized
    })?;

    request.extensions_mut().insert(AuthUser {
        uid: identity.uid,
        email: identity.email,
    });

    Ok(next.run(request).await)
}

/// Requires a stored user record with the admin role or admin status
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let uid = request
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.uid.clone())
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .repos
        .users
        .find_by_uid(&uid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(%uid, "Non-admin attempted admin access");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
