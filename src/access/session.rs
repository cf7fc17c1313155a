//! Session Token Handler
//! Mission: Issue and validate short-lived dashboard sessions

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::access::models::SessionClaims;

pub const SESSION_HOURS: i64 = 8;

pub struct SessionHandler {
    secret: String,
    expiration_hours: i64,
}

impl SessionHandler {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: SESSION_HOURS,
        }
    }

    /// Sign a session for an already-authorized email.
    pub fn issue(&self, email: &str, name: &str, admin: bool) -> Result<(String, usize)> {
        let expiration = Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;
        let expires_in = (self.expiration_hours * 3600) as usize;

        let claims = SessionClaims {
            sub: email.to_string(),
            name: name.to_string(),
            admin,
            exp: expiration,
        };

        debug!("Issuing session for {}, expires in {}h", email, self.expiration_hours);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign session")?;

        Ok((token, expires_in))
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let decoded = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired session")?;

        Ok(decoded.claims)
    }
}
