use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::{password, session};
use crate::error::{AppError, AppResult};
use crate::extractors::{JsonBody, SessionToken};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn validate_registration(req: &RegisterRequest) -> AppResult<String> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if username.len() > 150 {
        return Err(AppError::BadRequest(
            "Username must be 150 characters or less".into(),
        ));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }
    Ok(username)
}

/// POST /register/: create a user. The password is hashed before storage
/// and never echoed back.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<Response> {
    let username = validate_registration(&req)?;
    let hash = password::hash(req.password, state.config.auth.bcrypt_cost).await?;

    let user = state
        .users
        .register(&username, req.email.trim(), &hash)
        .await?;
    tracing::info!(user = %user.id, username = %user.username, "registered");

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// POST /login/: exchange credentials for a session token (cookie + body).
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Response> {
    // Same response for unknown user and wrong password
    let user = match state.users.find_by_username(req.username.trim()).await {
        Ok(user) => user,
        Err(crate::store::StoreError::NotFound(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e.into()),
    };
    if !password::verify(req.password, user.password_hash.clone()).await? {
        tracing::warn!(username = %user.username, "failed login");
        return Err(AppError::Unauthorized);
    }

    let hours = state.config.auth.session_hours;
    let token = session::create_session(&state.db, user.id, hours)?;

    let body = serde_json::json!({ "token": token, "username": user.username });
    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.auth.cookie_name, &token, hours),
        )],
        Json(body),
    )
        .into_response())
}

/// POST /logout/: drop the presented session, if any.
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    if let Some(token) = token {
        session::delete_session(&state.db, &token)?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
    )
        .into_response())
}
