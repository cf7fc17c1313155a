//! Dashboard HTTP API
//! Mission: Serve view models behind the access gate

pub mod handlers;
pub mod routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::dashboard::LoadFailure;
use crate::errors::LoadError;
use crate::filters::{ActiveFilter, FilterField};

pub use routes::build_router;

pub const RETRY_PATH: &str = "/api/refresh";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Nothing has loaded yet; carries the last failure if there was one.
    #[error("dashboard data unavailable")]
    Unavailable(Option<LoadFailure>),
    #[error("refresh failed: {0}")]
    RefreshFailed(#[from] LoadError),
    #[error("Unknown filter field: {0}")]
    UnknownFilterField(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unavailable(failure) => {
                let body = match failure {
                    Some(f) => json!({
                        "error": f.message,
                        "code": f.code,
                        "remediation": f.remediation,
                        "retry": RETRY_PATH,
                    }),
                    None => json!({
                        "error": "Dashboard data is still loading",
                        "retry": RETRY_PATH,
                    }),
                };
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            ApiError::RefreshFailed(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": e.to_string(),
                    "code": e.code(),
                    "remediation": e.remediation(),
                    "retry": RETRY_PATH,
                })),
            )
                .into_response(),
            ApiError::UnknownFilterField(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": self.to_string()}))).into_response()
            }
            ApiError::GroupNotFound(_) => {
                (StatusCode::NOT_FOUND, Json(json!({"error": self.to_string()}))).into_response()
            }
        }
    }
}

/// `?field=<key>&value=<text>`. A missing or empty value clears the filter.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub field: Option<String>,
    pub value: Option<String>,
}

impl FilterQuery {
    pub fn active_filter(&self) -> Result<Option<ActiveFilter>, ApiError> {
        let Some(key) = self.field.as_deref().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let field = FilterField::from_key(key)
            .ok_or_else(|| ApiError::UnknownFilterField(key.to_string()))?;
        let value = self.value.clone().unwrap_or_default();
        Ok(Some(ActiveFilter::new(field, value)))
    }
}
