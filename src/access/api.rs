//! Access API Endpoints
//! Mission: Email login and allowlist management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::access::{
    allowlist::{AddOutcome, RemoveOutcome},
    models::{
        default_display_name, is_valid_email, normalize_email, AddUserRequest, AllowedUser,
        LoginRequest, LoginResponse, SessionClaims, SessionUser,
    },
    AccessError, AccessState,
};

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AccessState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AccessError> {
    if !is_valid_email(&payload.email) {
        return Err(AccessError::InvalidEmail);
    }
    let email = normalize_email(&payload.email);
    info!("🔐 Login attempt: {}", email);

    let authorized = state.allowlist.is_authorized(&email)?;
    if !authorized {
        warn!("❌ Access denied: {}", email);
        return Err(AccessError::AccessDenied);
    }

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_display_name(&email));
    let admin = state.allowlist.is_admin(&email);

    let (token, expires_in) = state.sessions.issue(&email, &name, admin)?;

    info!("✅ Login successful: {} (admin: {})", email, admin);

    Ok(Json(LoginResponse {
        token,
        expires_in,
        user: SessionUser { email, name, admin },
    }))
}

/// GET /api/auth/me
pub async fn me(Extension(claims): Extension<SessionClaims>) -> Json<SessionUser> {
    Json(SessionUser::from_claims(&claims))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AccessState>,
) -> Result<Json<Vec<AllowedUser>>, AccessError> {
    Ok(Json(state.allowlist.list()?))
}

/// POST /api/admin/users
pub async fn add_user(
    State(state): State<AccessState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<Value>), AccessError> {
    if !is_valid_email(&payload.email) {
        return Err(AccessError::InvalidEmail);
    }
    let email = normalize_email(&payload.email);

    match state.allowlist.add(&email, &claims.sub)? {
        AddOutcome::Added => Ok((
            StatusCode::CREATED,
            Json(json!({"email": email, "message": "User added"})),
        )),
        AddOutcome::AlreadyAuthorized => Ok((
            StatusCode::OK,
            Json(json!({"email": email, "message": "User is already authorized"})),
        )),
    }
}

/// DELETE /api/admin/users/:email
pub async fn remove_user(
    State(state): State<AccessState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AccessError> {
    match state.allowlist.remove(&email)? {
        RemoveOutcome::Removed => Ok(Json(json!({
            "email": normalize_email(&email),
            "message": "User removed",
        }))),
        RemoveOutcome::NotFound => Err(AccessError::UserNotFound),
        RemoveOutcome::Protected => Err(AccessError::CannotRemoveAdmin),
    }
}
