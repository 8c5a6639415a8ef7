use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::params;
use serde::Deserialize;

use super::{is_unique_violation, not_found, StoreError};
use crate::db::models::Movie;
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

/// Movie catalog: create and read only.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Titles are unique. Existing reviews with the same title and no movie
    /// get linked to the new record.
    async fn create(&self, draft: MovieDraft) -> Result<Movie, StoreError>;

    async fn get(&self, id: i64) -> Result<Movie, StoreError>;
}

pub struct SqliteMovieCatalog {
    pool: DbPool,
}

impl SqliteMovieCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieCatalog for SqliteMovieCatalog {
    async fn create(&self, draft: MovieDraft) -> Result<Movie, StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let title = draft.title.trim().to_string();
        let release_date = draft.release_date.map(|d| d.format("%Y-%m-%d").to_string());

        tx.execute(
            "INSERT INTO movies (title, description, release_date) VALUES (?1, ?2, ?3)",
            params![title, draft.description, release_date],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("movie with title '{}' already exists", title))
            } else {
                StoreError::Sql(e)
            }
        })?;
        let id = tx.last_insert_rowid();

        let linked = tx.execute(
            "UPDATE reviews SET movie_id = ?1 WHERE movie_title = ?2 AND movie_id IS NULL",
            params![id, title],
        )?;
        tx.commit()?;

        if linked > 0 {
            tracing::debug!(movie = id, linked, "linked existing reviews to new movie");
        }

        Ok(Movie {
            id,
            title,
            description: draft.description,
            release_date,
        })
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        let conn = self.pool.get()?;

        conn.query_row(
            "SELECT id, title, description, release_date FROM movies WHERE id = ?1",
            params![id],
            |row| {
                Ok(Movie {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    release_date: row.get(3)?,
                })
            },
        )
        .map_err(not_found("movie"))
    }
}
