use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{Comment, Review};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, IdPath, JsonBody, QueryParams};
use crate::guard::Identity;
use crate::state::AppState;
use crate::store::comments::{CommentDraft, CommentFilter};
use crate::store::reviews::{ReviewDraft, ReviewFilter, ReviewPatch};

#[derive(Deserialize)]
pub struct CommentBody {
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews/", get(list_reviews).post(create_review))
        .route(
            "/reviews/{id}/",
            get(get_review)
                .put(replace_review)
                .patch(patch_review)
                .delete(delete_review),
        )
        .route("/my-reviews/", get(my_reviews))
        .route("/reviews/{id}/like/", post(like_review))
        .route("/reviews/{id}/unlike/", post(unlike_review))
        .route(
            "/reviews/{id}/comments/",
            get(list_comments).post(create_comment),
        )
}

async fn list_reviews(
    State(state): State<AppState>,
    identity: Identity,
    QueryParams(filter): QueryParams<ReviewFilter>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list(&identity, &filter).await?))
}

async fn create_review(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(draft): JsonBody<ReviewDraft>,
) -> AppResult<Response> {
    let review = state.reviews.create(&identity, draft).await?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

async fn get_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<Json<Review>> {
    Ok(Json(state.reviews.retrieve(&identity, id).await?))
}

/// PUT replaces every editable field.
async fn replace_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
    JsonBody(draft): JsonBody<ReviewDraft>,
) -> AppResult<Json<Review>> {
    Ok(Json(state.reviews.update(&identity, id, draft.into()).await?))
}

async fn patch_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<ReviewPatch>,
) -> AppResult<Json<Review>> {
    Ok(Json(state.reviews.update(&identity, id, patch).await?))
}

async fn delete_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<StatusCode> {
    state.reviews.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Review>>> {
    let filter = ReviewFilter {
        author: Some(user.id),
        ..Default::default()
    };
    let identity = Identity::User(user);
    Ok(Json(state.reviews.list(&identity, &filter).await?))
}

async fn like_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<Response> {
    let likes = state.likes.like(&identity, id).await?;
    let body = serde_json::json!({ "detail": "Review liked", "likes": likes });
    Ok((StatusCode::OK, Json(body)).into_response())
}

async fn unlike_review(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<Response> {
    let likes = state.likes.unlike(&identity, id).await?;
    let body = serde_json::json!({ "detail": "Review unliked", "likes": likes });
    Ok((StatusCode::OK, Json(body)).into_response())
}

async fn list_comments(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(review): IdPath,
) -> AppResult<Json<Vec<Comment>>> {
    // 404 for a missing review rather than an empty list
    state.reviews.retrieve(&identity, review).await?;

    let filter = CommentFilter {
        review: Some(review),
    };
    Ok(Json(state.comments.list(&identity, &filter).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(review): IdPath,
    JsonBody(body): JsonBody<CommentBody>,
) -> AppResult<Response> {
    let draft = CommentDraft {
        review,
        content: body.content,
    };
    let comment = state.comments.create(&identity, draft).await?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}
