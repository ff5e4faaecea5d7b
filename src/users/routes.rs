//! REST endpoints for registering and inspecting users.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::{ApiError, AppState, CurrentUser};

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    username: String,
    #[serde(default)]
    full_name: Option<String>,
}

/// Build the user routes. State is supplied by the top-level router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/me", get(get_me).delete(delete_me))
}

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let profile = state.users.create(&body.username, body.full_name).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /users/me
async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.get(user_id).await?;
    Ok(Json(profile))
}

/// DELETE /users/me
async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.users.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
