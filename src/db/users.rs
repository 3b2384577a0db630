use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{new_id, timestamp, user_from_row, Database, USER_COLUMNS};
use crate::error::{AppError, Result};
use crate::models::{Identity, User};

const DEFAULT_PROVIDER: &str = "google";

impl Database {
    /// Returns the user registered under the identity's email, creating it on
    /// first sign-in. Concurrent first sign-ins for one email converge on the
    /// same row.
    pub fn upsert_user(&self, identity: &Identity) -> Result<User> {
        let email = identity.email.trim();
        if email.is_empty() {
            return Err(AppError::validation("email is required"));
        }

        let id = new_id("user");
        let inserted = self.conn.execute(
            "INSERT INTO users (id, email, name, image, auth_provider, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(email) DO NOTHING",
            params![
                id,
                email,
                identity.name.clone().unwrap_or_default(),
                identity.image.as_deref().filter(|image| !image.is_empty()),
                identity.provider.as_deref().unwrap_or(DEFAULT_PROVIDER),
                timestamp(Utc::now())
            ],
        )?;
        if inserted == 1 {
            tracing::info!(user_id = %id, "registered new user");
        }

        self.user_by_email(email)?.ok_or(AppError::NotFound("user"))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn create_session(&self, user_id: &str) -> Result<String> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, timestamp(Utc::now())],
        )?;
        tracing::debug!(user_id, "opened session");
        Ok(token)
    }

    pub fn resolve_session(&self, token: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.email, u.name, u.image, u.auth_provider, u.created_at
                 FROM sessions s JOIN users u ON s.user_id = u.id
                 WHERE s.token = ?1",
                params![token],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }
}
