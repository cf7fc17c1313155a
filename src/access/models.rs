//! Access Models
//! Mission: Session claims and request/response bodies for the email gate

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
}

/// Loose shape check, not deliverability.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Local part of the email, used when no display name is given.
pub fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String, // lowercase email
    pub name: String,
    pub admin: bool,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub admin: bool,
}

impl SessionUser {
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            email: claims.sub.clone(),
            name: claims.name.clone(),
            admin: claims.admin,
        }
    }
}

/// One allowlist row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AllowedUser {
    pub email: String,
    pub added_by: Option<String>,
    pub added_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub email: String,
}
