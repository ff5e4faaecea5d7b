//! Integration tests for the tutor HTTP API.
//!
//! Each test spins up an Axum server on a random port backed by an
//! in-memory database and a stub LLM, then drives it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use japi_tutor::api::{AppState, USER_ID_HEADER, app_router};
use japi_tutor::chat::{ChatService, FALLBACK_REPLY};
use japi_tutor::error::LlmError;
use japi_tutor::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use japi_tutor::store::{Database, LibSqlBackend};
use japi_tutor::users::UserService;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const STUB_REPLY: &str = "Nice! What did you do at the park?";

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    fail: bool,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.fail {
            return Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "offline".into(),
            });
        }
        Ok(CompletionResponse {
            content: STUB_REPLY.to_string(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Start an Axum server on a random port, return its base URL.
async fn start_server(fail_llm: bool) -> String {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm { fail: fail_llm });

    let state = AppState {
        chat: Arc::new(ChatService::new(Arc::clone(&db), llm).with_per_user_locks()),
        users: Arc::new(UserService::new(db)),
        history_limit: 20,
    };
    let app = app_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

/// Register a user and return their id.
async fn signup(client: &Client, base: &str, username: &str, full_name: &str) -> String {
    let resp = client
        .post(format!("{base}/users"))
        .json(&json!({"username": username, "full_name": full_name}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["is_onboarded"], false);
    body["id"].as_str().unwrap().to_string()
}

async fn say(client: &Client, base: &str, user_id: &str, content: &str) -> Value {
    let resp = client
        .post(format!("{base}/chats"))
        .header(USER_ID_HEADER, user_id)
        .json(&json!({"content": content}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "POST /chats {content:?}");
    resp.json().await.unwrap()
}

#[tokio::test]
async fn health_and_root() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(false).await;
        let client = Client::new();

        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let root: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
        assert!(root["message"].as_str().unwrap().contains("Japi"));
        assert!(root["version"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn onboarding_then_free_chat() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(false).await;
        let client = Client::new();
        let user_id = signup(&client, &base, "ana", "Ana").await;

        let body = say(&client, &base, &user_id, "hello").await;
        assert_eq!(
            body["message"]["content"],
            "Hi Ana! Welcome to Japi. What's your English learning goal?"
        );
        assert_eq!(body["message"]["role"], "ai");
        assert_eq!(body["is_onboarded"], false);
        assert_eq!(body["history"].as_array().unwrap().len(), 2);

        let body = say(&client, &base, &user_id, "nothing").await;
        assert!(
            body["message"]["content"]
                .as_str()
                .unwrap()
                .contains("what you'd like to achieve")
        );

        let body = say(&client, &base, &user_id, "Travel and talk to locals").await;
        assert!(
            body["message"]["content"]
                .as_str()
                .unwrap()
                .contains("(Beginner/Intermediate/Advanced)")
        );

        let body = say(&client, &base, &user_id, "Intermediate").await;
        assert_eq!(
            body["message"]["content"],
            "Got it! Let's begin with a practice conversation."
        );
        assert_eq!(body["is_onboarded"], true);
        assert_eq!(body["history"].as_array().unwrap().len(), 8);

        let me: Value = client
            .get(format!("{base}/users/me"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(me["learning_goal"], "Travel and talk to locals");
        assert_eq!(me["english_level"], "intermediate");
        assert_eq!(me["is_onboarded"], true);

        let body = say(&client, &base, &user_id, "I walked in the park").await;
        assert_eq!(body["message"]["content"], STUB_REPLY);
        assert_eq!(body["is_onboarded"], true);
        assert!(body.get("history").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn free_chat_falls_back_when_model_fails() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(true).await;
        let client = Client::new();
        let user_id = signup(&client, &base, "bob", "Bo").await;

        for msg in ["hi", "Pass my English exam", "I am a beginner"] {
            say(&client, &base, &user_id, msg).await;
        }

        let body = say(&client, &base, &user_id, "How are you?").await;
        assert_eq!(body["message"]["content"], FALLBACK_REPLY);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn history_listing_and_clearing() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(false).await;
        let client = Client::new();
        let user_id = signup(&client, &base, "cyd", "").await;

        say(&client, &base, &user_id, "hello").await;
        say(&client, &base, &user_id, "idk").await;

        let history: Vec<Value> = client
            .get(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0]["content"], "hello");
        // Blank full name falls back to the username
        assert!(history[1]["content"].as_str().unwrap().starts_with("Hi cyd!"));

        let limited: Vec<Value> = client
            .get(format!("{base}/chats?limit=1"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0]["role"], "ai");

        let resp = client
            .delete(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "Chat history cleared successfully");

        let history: Vec<Value> = client
            .get(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(history.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn request_errors() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(false).await;
        let client = Client::new();
        let user_id = signup(&client, &base, "dee", "Dee").await;

        // Missing identity
        let resp = client
            .post(format!("{base}/chats"))
            .json(&json!({"content": "hi"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Malformed identity
        let resp = client
            .get(format!("{base}/chats"))
            .header(USER_ID_HEADER, "42")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Unknown user
        let resp = client
            .get(format!("{base}/users/me"))
            .header(USER_ID_HEADER, "00000000-0000-4000-8000-000000000000")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // Empty message
        let resp = client
            .post(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .json(&json!({"content": "  "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Duplicate username
        let resp = client
            .post(format!("{base}/users"))
            .json(&json!({"username": "dee"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("dee"));

        // Undecodable query and body come back as JSON errors too
        let resp = client
            .get(format!("{base}/chats?limit=abc"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        let resp = client
            .post(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .header("content-type", "application/json")
            .body("{\"text\": 1}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn deleting_account_removes_everything() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(false).await;
        let client = Client::new();
        let user_id = signup(&client, &base, "eve", "Eve").await;
        say(&client, &base, &user_id, "hello").await;

        let resp = client
            .delete(format!("{base}/users/me"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = client
            .get(format!("{base}/chats"))
            .header(USER_ID_HEADER, &user_id)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // The username is free again
        signup(&client, &base, "eve", "Eve").await;
    })
    .await
    .expect("test timed out");
}
