//! REST endpoints for sending messages and managing chat history.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use super::model::{HistoryQuery, SendMessageRequest};
use crate::api::{ApiError, AppState, CurrentUser};

/// Build the chat routes. State is supplied by the top-level router.
pub fn chat_routes() -> Router<AppState> {
    Router::new().route(
        "/chats",
        post(send_message).get(get_history).delete(clear_history),
    )
}

/// POST /chats
async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let response = state.chat.send_message(user_id, &body.content).await?;
    Ok(Json(response))
}

/// GET /chats?limit=N
async fn get_history(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(state.history_limit);
    let history = state.chat.get_history(user_id, limit).await?;
    Ok(Json(history))
}

/// DELETE /chats
async fn clear_history(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.chat.clear_history(user_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Chat history cleared successfully"
    })))
}
