//! Session Middleware
//! Mission: Keep dashboard routes behind a live allowlist check

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::access::{models::SessionClaims, AccessError, AccessState};

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Validates the session and re-checks the allowlist on every request, so a
/// revoked email loses access before its token expires.
pub async fn require_session(
    State(state): State<AccessState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let token = bearer_token(&req).ok_or(AccessError::MissingToken)?;
    let claims = state
        .sessions
        .validate(token)
        .map_err(|_| AccessError::InvalidToken)?;

    let authorized = state
        .allowlist
        .is_authorized(&claims.sub)?;
    if !authorized {
        warn!("❌ Session for revoked email: {}", claims.sub);
        return Err(AccessError::AccessDenied);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layer after `require_session`.
pub async fn require_admin(
    State(state): State<AccessState>,
    req: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let claims = extract_claims(&req).ok_or(AccessError::MissingToken)?;
    if !claims.admin || !state.allowlist.is_admin(&claims.sub) {
        return Err(AccessError::AdminRequired);
    }
    Ok(next.run(req).await)
}

pub fn extract_claims(req: &Request) -> Option<&SessionClaims> {
    req.extensions().get::<SessionClaims>()
}
