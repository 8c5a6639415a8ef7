// Store interfaces - every database side effect goes through these traits
pub mod comments;
pub mod likes;
pub mod movies;
pub mod reviews;
pub mod users;

use async_trait::async_trait;
use rusqlite::ffi;
use thiserror::Error;

use crate::db::models::UserId;
use crate::resource::Resource;

pub use comments::SqliteCommentStore;
pub use likes::{LikeSet, SqliteLikeSet};
pub use movies::{MovieCatalog, SqliteMovieCatalog};
pub use reviews::SqliteReviewStore;
pub use users::{SqliteUserDirectory, UserDirectory};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Persistence contract for an owned resource.
#[async_trait]
pub trait Store<E: Resource>: Send + Sync {
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>, StoreError>;

    async fn get(&self, id: i64) -> Result<E, StoreError>;

    /// Insert a new record authored by `author`.
    async fn create(&self, author: UserId, draft: E::Draft) -> Result<E, StoreError>;

    async fn update(&self, id: i64, patch: E::Patch) -> Result<E, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// True when an insert or update hit a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// True when a referenced row (review, user) is missing.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
        _ => false,
    }
}

/// Map `QueryReturnedNoRows` to a typed not-found.
pub(crate) fn not_found(what: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
        other => StoreError::Sql(other),
    }
}
