use async_trait::async_trait;
use rusqlite::{params, Row};

use super::{is_unique_violation, not_found, StoreError};
use crate::db::models::{User, UserId};
use crate::state::DbPool;

/// User directory. Stores password hashes only; hashing happens in
/// `auth::password` before anything reaches this trait.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Username uniqueness is the table's UNIQUE constraint.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Removes the user with their reviews, comments, likes and sessions.
    async fn delete(&self, id: UserId) -> Result<(), StoreError>;
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

pub struct SqliteUserDirectory {
    pool: DbPool,
}

impl SqliteUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![username, email, password_hash],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict("A user with that username already exists.".into())
            } else {
                StoreError::Sql(e)
            }
        })?;

        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    async fn get(&self, id: UserId) -> Result<User, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, email, password_hash FROM users WHERE id = ?1",
            params![id.0],
            user_from_row,
        )
        .map_err(not_found("user"))
    }

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, email, password_hash FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .map_err(not_found("user"))
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        if rows == 0 {
            return Err(StoreError::NotFound("user"));
        }
        tracing::info!(user = %id, "user deleted");
        Ok(())
    }
}
