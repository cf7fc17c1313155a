//! Allowlist Storage
//! Mission: Persist the authorized email list with SQLite

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::access::models::{normalize_email, AllowedUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyAuthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// The admin email is never removable.
    Protected,
}

/// Email allowlist with SQLite backend
pub struct AllowlistStore {
    db_path: String,
    admin_email: String,
}

impl AllowlistStore {
    /// Open (or create) the store and make sure the admin is allowlisted.
    pub fn new(db_path: &str, admin_email: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            admin_email: normalize_email(admin_email),
        };
        store.init_db()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open allowlist db at {}", self.db_path))
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS authorized_users (
                email TEXT PRIMARY KEY,
                added_by TEXT,
                added_at TEXT NOT NULL
            )",
            [],
        )?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO authorized_users (email, added_by, added_at)
                 VALUES (?1, NULL, ?2)",
                params![self.admin_email, Utc::now().to_rfc3339()],
            )
            .context("Failed to seed admin email")?;
        if inserted > 0 {
            info!("🔐 Seeded allowlist with admin {}", self.admin_email);
        }

        Ok(())
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn is_admin(&self, email: &str) -> bool {
        normalize_email(email) == self.admin_email
    }

    /// Case-insensitive allowlist check.
    pub fn is_authorized(&self, email: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT email FROM authorized_users WHERE email = ?1",
                params![normalize_email(email)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list(&self) -> Result<Vec<AllowedUser>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT email, added_by, added_at FROM authorized_users ORDER BY email",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(AllowedUser {
                    email: row.get(0)?,
                    added_by: row.get(1)?,
                    added_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn add(&self, email: &str, added_by: &str) -> Result<AddOutcome> {
        let conn = self.connect()?;
        let email = normalize_email(email);
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO authorized_users (email, added_by, added_at)
                 VALUES (?1, ?2, ?3)",
                params![email, normalize_email(added_by), Utc::now().to_rfc3339()],
            )
            .context("Failed to insert authorized user")?;

        if inserted == 0 {
            return Ok(AddOutcome::AlreadyAuthorized);
        }
        info!("✅ Authorized {} (by {})", email, added_by);
        Ok(AddOutcome::Added)
    }

    pub fn remove(&self, email: &str) -> Result<RemoveOutcome> {
        let email = normalize_email(email);
        if email == self.admin_email {
            return Ok(RemoveOutcome::Protected);
        }

        let conn = self.connect()?;
        let rows_affected = conn.execute(
            "DELETE FROM authorized_users WHERE email = ?1",
            params![email],
        )?;
        if rows_affected == 0 {
            return Ok(RemoveOutcome::NotFound);
        }

        info!("🗑️  Revoked access for {}", email);
        Ok(RemoveOutcome::Removed)
    }
}
