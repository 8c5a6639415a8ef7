use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::{IdPath, JsonBody};
use crate::guard::Identity;
use crate::routes::reviews::CommentBody;
use crate::state::AppState;
use crate::store::comments::CommentPatch;

#[derive(Deserialize)]
pub struct CommentPatchBody {
    #[serde(default)]
    pub content: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/comments/{id}/",
        get(get_comment)
            .put(replace_comment)
            .patch(patch_comment)
            .delete(delete_comment),
    )
}

async fn get_comment(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<Json<Comment>> {
    Ok(Json(state.comments.retrieve(&identity, id).await?))
}

async fn replace_comment(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<CommentBody>,
) -> AppResult<Json<Comment>> {
    let patch = CommentPatch {
        content: Some(body.content),
    };
    Ok(Json(state.comments.update(&identity, id, patch).await?))
}

async fn patch_comment(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<CommentPatchBody>,
) -> AppResult<Json<Comment>> {
    let patch = CommentPatch {
        content: body.content,
    };
    Ok(Json(state.comments.update(&identity, id, patch).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<StatusCode> {
    state.comments.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
