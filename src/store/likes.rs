use async_trait::async_trait;
use rusqlite::params;

use super::{is_foreign_key_violation, is_unique_violation, StoreError};
use crate::db::models::UserId;
use crate::state::DbPool;

/// Per-review set of users who liked it.
///
/// Membership changes are single statements: duplicates are rejected by the
/// `(review_id, user_id)` primary key and removal reports whether a row was
/// there, so concurrent callers cannot both win.
#[async_trait]
pub trait LikeSet: Send + Sync {
    /// Returns `false` if the user already liked the review.
    async fn add(&self, review: i64, user: UserId) -> Result<bool, StoreError>;

    /// Returns `false` if the user had not liked the review.
    async fn remove(&self, review: i64, user: UserId) -> Result<bool, StoreError>;

    async fn likers(&self, review: i64) -> Result<Vec<UserId>, StoreError>;
}

pub struct SqliteLikeSet {
    pool: DbPool,
}

impl SqliteLikeSet {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeSet for SqliteLikeSet {
    async fn add(&self, review: i64, user: UserId) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        match conn.execute(
            "INSERT INTO review_likes (review_id, user_id) VALUES (?1, ?2)",
            params![review, user.0],
        ) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) if is_foreign_key_violation(&e) => Err(StoreError::NotFound("review")),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, review: i64, user: UserId) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "DELETE FROM review_likes WHERE review_id = ?1 AND user_id = ?2",
            params![review, user.0],
        )?;
        Ok(rows > 0)
    }

    async fn likers(&self, review: i64) -> Result<Vec<UserId>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn
            .prepare("SELECT user_id FROM review_likes WHERE review_id = ?1 ORDER BY user_id")?;
        let likers = stmt
            .query_map(params![review], |row| row.get(0).map(UserId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(likers)
    }
}
