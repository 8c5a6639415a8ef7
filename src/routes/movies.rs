use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::db::models::MovieDetail;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, IdPath, JsonBody};
use crate::guard::{self, Identity, Operation};
use crate::state::AppState;
use crate::store::movies::MovieDraft;
use crate::store::reviews::ReviewFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies/", post(create_movie))
        .route("/movies/{id}/", get(movie_detail))
}

async fn create_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(draft): JsonBody<MovieDraft>,
) -> AppResult<Response> {
    validate_title(&draft.title)?;

    let movie = state.movies.create(draft).await?;
    tracing::info!(movie = movie.id, title = %movie.title, by = %user.id, "movie created");
    Ok((StatusCode::CREATED, Json(movie)).into_response())
}

fn validate_title(title: &str) -> AppResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title may not be blank".into()));
    }
    if title.chars().count() > 255 {
        return Err(AppError::BadRequest(
            "title must be 255 characters or less".into(),
        ));
    }
    Ok(())
}

/// The movie with the reviews that reference it.
async fn movie_detail(
    State(state): State<AppState>,
    identity: Identity,
    IdPath(id): IdPath,
) -> AppResult<Json<MovieDetail>> {
    guard::admit(&identity, Operation::Read, state.config.access.read_policy)?;

    let movie = state.movies.get(id).await?;
    let filter = ReviewFilter {
        movie_id: Some(movie.id),
        ..Default::default()
    };
    let reviews = state.reviews.list(&identity, &filter).await?;

    Ok(Json(MovieDetail { movie, reviews }))
}
