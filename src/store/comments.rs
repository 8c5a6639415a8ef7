use async_trait::async_trait;
use rusqlite::{params, Connection, Row};

use super::{is_foreign_key_violation, not_found, Store, StoreError};
use crate::db::models::{Comment, UserId};
use crate::guard::Owned;
use crate::resource::Resource;
use crate::state::DbPool;

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub review: Option<i64>,
}

/// A new comment; the review comes from the request path.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub review: i64,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentPatch {
    pub content: Option<String>,
}

impl Owned for Comment {
    fn owner(&self) -> UserId {
        self.author
    }
}

impl Resource for Comment {
    const NAME: &'static str = "comment";

    type Filter = CommentFilter;
    type Draft = CommentDraft;
    type Patch = CommentPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn validate_draft(draft: &CommentDraft) -> Result<(), String> {
        validate_content(&draft.content)
    }

    fn validate_patch(patch: &CommentPatch) -> Result<(), String> {
        match &patch.content {
            Some(content) => validate_content(content),
            None => Ok(()),
        }
    }
}

fn validate_content(content: &str) -> Result<(), String> {
    let content = content.trim();
    if content.is_empty() {
        return Err("Comment cannot be empty".into());
    }
    if content.chars().count() > 2000 {
        return Err("Comment must be 2000 characters or less".into());
    }
    Ok(())
}

const SELECT_COMMENT: &str = "SELECT c.id, c.review_id, c.user_id, u.username, c.content, c.created_at
     FROM comments c
     JOIN users u ON u.id = c.user_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        review: row.get(1)?,
        author: UserId(row.get(2)?),
        username: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn fetch_comment(conn: &Connection, id: i64) -> Result<Comment, StoreError> {
    conn.query_row(
        &format!("{} WHERE c.id = ?1", SELECT_COMMENT),
        params![id],
        comment_from_row,
    )
    .map_err(not_found("comment"))
}

pub struct SqliteCommentStore {
    pool: DbPool,
}

impl SqliteCommentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store<Comment> for SqliteCommentStore {
    async fn list(&self, filter: &CommentFilter) -> Result<Vec<Comment>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR c.review_id = ?1) ORDER BY c.id ASC",
            SELECT_COMMENT
        ))?;
        let comments = stmt
            .query_map(params![filter.review], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    async fn get(&self, id: i64) -> Result<Comment, StoreError> {
        let conn = self.pool.get()?;
        fetch_comment(&conn, id)
    }

    async fn create(&self, author: UserId, draft: CommentDraft) -> Result<Comment, StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO comments (review_id, user_id, content) VALUES (?1, ?2, ?3)",
            params![draft.review, author.0, draft.content.trim()],
        )
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound("review")
            } else {
                StoreError::Sql(e)
            }
        })?;

        fetch_comment(&conn, conn.last_insert_rowid())
    }

    async fn update(&self, id: i64, patch: CommentPatch) -> Result<Comment, StoreError> {
        let conn = self.pool.get()?;

        let content = patch.content.as_deref().map(str::trim);
        let rows = conn.execute(
            "UPDATE comments SET content = COALESCE(?2, content) WHERE id = ?1",
            params![id, content],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("comment"));
        }

        fetch_comment(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound("comment"));
        }
        Ok(())
    }
}
