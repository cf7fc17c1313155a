//! Access Gate
//! Mission: Email allowlist login with signed sessions

pub mod allowlist;
pub mod api;
pub mod middleware;
pub mod models;
pub mod session;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub use allowlist::AllowlistStore;
pub use middleware::{require_admin, require_session};
pub use session::SessionHandler;

/// Shared access state
#[derive(Clone)]
pub struct AccessState {
    pub allowlist: Arc<AllowlistStore>,
    pub sessions: Arc<SessionHandler>,
}

impl AccessState {
    pub fn new(allowlist: AllowlistStore, sessions: SessionHandler) -> Self {
        Self {
            allowlist: Arc::new(allowlist),
            sessions: Arc::new(sessions),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Access denied. Your email is not on the authorized list.")]
    AccessDenied,
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid or expired session")]
    InvalidToken,
    #[error("Admin access required")]
    AdminRequired,
    #[error("User not found")]
    UserNotFound,
    #[error("The admin email cannot be removed")]
    CannotRemoveAdmin,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AccessError {
    fn from(err: anyhow::Error) -> Self {
        AccessError::Internal(format!("{err:#}"))
    }
}

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::InvalidEmail | AccessError::CannotRemoveAdmin => StatusCode::BAD_REQUEST,
            AccessError::AccessDenied | AccessError::AdminRequired => StatusCode::FORBIDDEN,
            AccessError::MissingToken | AccessError::InvalidToken => StatusCode::UNAUTHORIZED,
            AccessError::UserNotFound => StatusCode::NOT_FOUND,
            AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AccessError::Internal(details) => {
                error!("Access store failure: {}", details);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
