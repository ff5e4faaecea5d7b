//! HTTP surface: shared state, caller identity, error mapping, and the
//! top-level router.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use uuid::Uuid;

use crate::chat::{ChatService, chat_routes};
use crate::error::{ChatError, DatabaseError, Error};
use crate::users::{UserService, user_routes};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub users: Arc<UserService>,
    /// Default `limit` for `GET /chats`.
    pub history_limit: usize,
}

/// Build the full router with CORS applied.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_routes())
        .merge(chat_routes())
        .with_state(state)
        .layer(cors)
}

// ── Service info ────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to Japi AI English Tutor API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "japi-tutor"
    }))
}

// ── Caller identity ─────────────────────────────────────────────────────

/// The authenticated caller, read from the `x-user-id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized("missing x-user-id header"))?;

        Uuid::parse_str(raw.trim())
            .map(CurrentUser)
            .map_err(|_| ApiError::Unauthorized("x-user-id is not a valid UUID"))
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    /// Body or query string the extractors could not decode.
    BadRequest(String),
    Service(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Service(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.to_string()),
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            Self::Service(e) => status_for(&e),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

fn status_for(e: &Error) -> (StatusCode, String) {
    match e {
        Error::Chat(ChatError::UserNotFound(_))
        | Error::Database(DatabaseError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, "User not found".to_string())
        }
        Error::Chat(
            err @ (ChatError::EmptyMessage
            | ChatError::UsernameTaken(_)
            | ChatError::InvalidUsername(_)),
        ) => (StatusCode::BAD_REQUEST, err.to_string()),
        other => {
            error!(error = %other, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
