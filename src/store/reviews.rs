use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use super::{not_found, Store, StoreError};
use crate::db::models::{Review, UserId};
use crate::guard::Owned;
use crate::resource::Resource;
use crate::state::DbPool;

/// Query filters for listing reviews. Text and rating match exactly; a blank
/// value is the same as leaving the filter out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub movie_title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub rating: Option<i64>,
    #[serde(skip)]
    pub author: Option<UserId>,
    #[serde(skip)]
    pub movie_id: Option<i64>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Body of a create or full (PUT) update. Any author field is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub movie_title: String,
    pub review_content: String,
    pub rating: i64,
}

/// Body of a partial (PATCH) update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub movie_title: Option<String>,
    pub review_content: Option<String>,
    pub rating: Option<i64>,
}

impl From<ReviewDraft> for ReviewPatch {
    fn from(draft: ReviewDraft) -> Self {
        Self {
            movie_title: Some(draft.movie_title),
            review_content: Some(draft.review_content),
            rating: Some(draft.rating),
        }
    }
}

impl Owned for Review {
    fn owner(&self) -> UserId {
        self.author
    }
}

impl Resource for Review {
    const NAME: &'static str = "review";

    type Filter = ReviewFilter;
    type Draft = ReviewDraft;
    type Patch = ReviewPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn validate_draft(draft: &ReviewDraft) -> Result<(), String> {
        require_text("movie_title", &draft.movie_title)?;
        require_text("review_content", &draft.review_content)
    }

    fn validate_patch(patch: &ReviewPatch) -> Result<(), String> {
        if let Some(title) = &patch.movie_title {
            require_text("movie_title", title)?;
        }
        if let Some(content) = &patch.review_content {
            require_text("review_content", content)?;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} may not be blank", field));
    }
    Ok(())
}

const SELECT_REVIEW: &str = "SELECT r.id, r.movie_id, r.movie_title, r.review_content, r.rating,
        r.user_id, u.username, r.created_date,
        (SELECT group_concat(l.user_id) FROM review_likes l WHERE l.review_id = r.id)
     FROM reviews r
     JOIN users u ON u.id = r.user_id";

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    let likes: Option<String> = row.get(8)?;
    Ok(Review {
        id: row.get(0)?,
        movie_id: row.get(1)?,
        movie_title: row.get(2)?,
        review_content: row.get(3)?,
        rating: row.get(4)?,
        author: UserId(row.get(5)?),
        username: row.get(6)?,
        created_date: row.get(7)?,
        likes: parse_likers(likes.as_deref()),
    })
}

fn parse_likers(concatenated: Option<&str>) -> Vec<UserId> {
    let mut likers: Vec<UserId> = concatenated
        .unwrap_or("")
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .map(UserId)
        .collect();
    likers.sort();
    likers
}

pub(crate) fn fetch_review(conn: &Connection, id: i64) -> Result<Review, StoreError> {
    conn.query_row(
        &format!("{} WHERE r.id = ?1", SELECT_REVIEW),
        params![id],
        review_from_row,
    )
    .map_err(not_found("review"))
}

/// SQLite implementation
pub struct SqliteReviewStore {
    pool: DbPool,
}

impl SqliteReviewStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store<Review> for SqliteReviewStore {
    async fn list(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let conn = self.pool.get()?;

        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(title) = &filter.movie_title {
            args.push(Value::Text(title.clone()));
            clauses.push(format!("r.movie_title = ?{}", args.len()));
        }
        if let Some(rating) = filter.rating {
            args.push(Value::Integer(rating));
            clauses.push(format!("r.rating = ?{}", args.len()));
        }
        if let Some(author) = filter.author {
            args.push(Value::Integer(author.0));
            clauses.push(format!("r.user_id = ?{}", args.len()));
        }
        if let Some(movie_id) = filter.movie_id {
            args.push(Value::Integer(movie_id));
            clauses.push(format!("r.movie_id = ?{}", args.len()));
        }

        let mut sql = SELECT_REVIEW.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY r.id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let reviews = stmt
            .query_map(params_from_iter(args), review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    async fn get(&self, id: i64) -> Result<Review, StoreError> {
        let conn = self.pool.get()?;
        fetch_review(&conn, id)
    }

    async fn create(&self, author: UserId, draft: ReviewDraft) -> Result<Review, StoreError> {
        let conn = self.pool.get()?;

        // movie_id is resolved from the title at write time
        conn.execute(
            "INSERT INTO reviews (movie_id, movie_title, review_content, rating, user_id)
             VALUES ((SELECT id FROM movies WHERE title = ?1), ?1, ?2, ?3, ?4)",
            params![draft.movie_title.trim(), draft.review_content, draft.rating, author.0],
        )
        .map_err(|e| {
            if super::is_foreign_key_violation(&e) {
                StoreError::NotFound("user")
            } else {
                StoreError::Sql(e)
            }
        })?;

        fetch_review(&conn, conn.last_insert_rowid())
    }

    async fn update(&self, id: i64, patch: ReviewPatch) -> Result<Review, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE reviews SET
               movie_title = COALESCE(?2, movie_title),
               movie_id = CASE WHEN ?2 IS NULL THEN movie_id
                               ELSE (SELECT id FROM movies WHERE title = ?2) END,
               review_content = COALESCE(?3, review_content),
               rating = COALESCE(?4, rating)
             WHERE id = ?1",
            params![
                id,
                patch.movie_title.as_deref().map(str::trim),
                patch.review_content,
                patch.rating
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound("review"));
        }

        fetch_review(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        // comments and likes go with it (ON DELETE CASCADE)
        let rows = conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound("review"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    fn draft(title: &str, rating: i64) -> ReviewDraft {
        ReviewDraft {
            movie_title: title.into(),
            review_content: "worth the ticket".into(),
            rating,
        }
    }

    #[tokio::test]
    async fn create_stamps_author_and_timestamp() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        let store = SqliteReviewStore::new(pool);

        let review = store.create(alice, draft("Dune", 5)).await.unwrap();
        assert_eq!(review.author, alice);
        assert_eq!(review.username, "alice");
        assert_eq!(review.rating, 5);
        assert!(!review.created_date.is_empty());
        assert!(review.likes.is_empty());
        assert_eq!(review.movie_id, None);
    }

    #[tokio::test]
    async fn create_links_existing_movie_by_title() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        pool.get()
            .unwrap()
            .execute("INSERT INTO movies (title) VALUES ('Dune')", [])
            .unwrap();
        let store = SqliteReviewStore::new(pool);

        let linked = store.create(alice, draft("Dune", 4)).await.unwrap();
        assert_eq!(linked.movie_id, Some(1));

        let unlinked = store.create(alice, draft("Arrival", 4)).await.unwrap();
        assert_eq!(unlinked.movie_id, None);
    }

    #[test]
    fn blank_filter_values_are_ignored() {
        let filter: ReviewFilter =
            serde_json::from_value(serde_json::json!({ "movie_title": " ", "rating": "" }))
                .unwrap();
        assert_eq!(filter.movie_title, None);
        assert_eq!(filter.rating, None);

        let filter: ReviewFilter =
            serde_json::from_value(serde_json::json!({ "rating": "4" })).unwrap();
        assert_eq!(filter.rating, Some(4));

        let bad = serde_json::from_value::<ReviewFilter>(serde_json::json!({ "rating": "four" }));
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn movie_title_is_trimmed_before_linking() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        pool.get()
            .unwrap()
            .execute("INSERT INTO movies (title) VALUES ('Dune')", [])
            .unwrap();
        let store = SqliteReviewStore::new(pool);

        let review = store.create(alice, draft("Dune ", 4)).await.unwrap();
        assert_eq!(review.movie_title, "Dune");
        assert_eq!(review.movie_id, Some(1));

        let other = store.create(alice, draft("Heat", 4)).await.unwrap();
        let moved = store
            .update(
                other.id,
                ReviewPatch {
                    movie_title: Some("  Dune".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.movie_title, "Dune");
        assert_eq!(moved.movie_id, Some(1));
    }

    #[tokio::test]
    async fn rating_is_not_range_checked() {
        // No bounds are enforced on rating; any integer is stored as given.
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        let store = SqliteReviewStore::new(pool);

        let review = store.create(alice, draft("Cats", -3)).await.unwrap();
        assert_eq!(review.rating, -3);
    }

    #[tokio::test]
    async fn list_filters_by_title_rating_and_author() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        let bob = testing::insert_user(&pool, "bob");
        let store = SqliteReviewStore::new(pool);

        store.create(alice, draft("Dune", 5)).await.unwrap();
        store.create(alice, draft("Dune", 3)).await.unwrap();
        store.create(bob, draft("Dune", 5)).await.unwrap();
        store.create(bob, draft("Heat", 5)).await.unwrap();

        let all = store.list(&ReviewFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);

        let dune = ReviewFilter {
            movie_title: Some("Dune".into()),
            ..Default::default()
        };
        assert_eq!(store.list(&dune).await.unwrap().len(), 3);

        let dune_fives = ReviewFilter {
            movie_title: Some("Dune".into()),
            rating: Some(5),
            ..Default::default()
        };
        assert_eq!(store.list(&dune_fives).await.unwrap().len(), 2);

        let bobs = ReviewFilter {
            author: Some(bob),
            ..Default::default()
        };
        let bobs = store.list(&bobs).await.unwrap();
        assert_eq!(bobs.len(), 2);
        assert!(bobs.iter().all(|r| r.author == bob));
    }

    #[tokio::test]
    async fn patch_changes_only_given_fields() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        let store = SqliteReviewStore::new(pool);

        let review = store.create(alice, draft("Dune", 5)).await.unwrap();
        let patched = store
            .update(
                review.id,
                ReviewPatch {
                    rating: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(patched.rating, 2);
        assert_eq!(patched.movie_title, "Dune");
        assert_eq!(patched.review_content, review.review_content);
        assert_eq!(patched.author, alice);
        assert_eq!(patched.created_date, review.created_date);
    }

    #[tokio::test]
    async fn retitling_relinks_movie() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        pool.get()
            .unwrap()
            .execute("INSERT INTO movies (title) VALUES ('Heat')", [])
            .unwrap();
        let store = SqliteReviewStore::new(pool);

        let review = store.create(alice, draft("Dune", 5)).await.unwrap();
        let moved = store
            .update(
                review.id,
                ReviewPatch {
                    movie_title: Some("Heat".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.movie_id, Some(1));
    }

    #[tokio::test]
    async fn update_and_delete_missing_review_is_not_found() {
        let (pool, _temp) = testing::pool();
        let store = SqliteReviewStore::new(pool);

        let err = store.update(99, ReviewPatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("review")));

        let err = store.delete(99).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("review")));

        let err = store.get(99).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("review")));
    }

    #[tokio::test]
    async fn delete_cascades_comments_and_likes() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");
        let bob = testing::insert_user(&pool, "bob");
        let store = SqliteReviewStore::new(pool.clone());

        let review = store.create(alice, draft("Dune", 5)).await.unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO review_likes (review_id, user_id) VALUES (?1, ?2)",
                params![review.id, bob.0],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO comments (review_id, user_id, content) VALUES (?1, ?2, 'agreed')",
                params![review.id, bob.0],
            )
            .unwrap();
        }

        store.delete(review.id).await.unwrap();

        let conn = pool.get().unwrap();
        let likes: i64 = conn
            .query_row("SELECT COUNT(*) FROM review_likes", [], |r| r.get(0))
            .unwrap();
        let comments: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(likes, 0);
        assert_eq!(comments, 0);
    }

    #[test]
    fn parse_likers_sorts_and_skips_garbage() {
        assert_eq!(parse_likers(None), Vec::<UserId>::new());
        assert_eq!(
            parse_likers(Some("3,1,x,2")),
            vec![UserId(1), UserId(2), UserId(3)]
        );
    }

    #[test]
    fn blank_fields_fail_validation() {
        assert!(Review::validate_draft(&draft("  ", 5)).is_err());
        assert!(Review::validate_draft(&draft("Dune", 5)).is_ok());
        let patch = ReviewPatch {
            review_content: Some("".into()),
            ..Default::default()
        };
        assert!(Review::validate_patch(&patch).is_err());
        assert!(Review::validate_patch(&ReviewPatch::default()).is_ok());
    }
}
