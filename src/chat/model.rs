//! Request and response shapes for the chat surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{ConversationMessage, MessageRole};

/// A stored message as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationMessage> for MessageView {
    fn from(msg: ConversationMessage) -> Self {
        Self {
            id: msg.id,
            user_id: msg.user_id,
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
        }
    }
}

/// Result of one chat turn.
///
/// `history` is only present while the user is onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: MessageView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<MessageView>>,
    pub is_onboarded: bool,
}

/// Body of `POST /chats`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Query of `GET /chats`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(content: &str) -> MessageView {
        MessageView {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: MessageRole::Ai,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn free_chat_response_omits_history() {
        let resp = ChatResponse {
            message: view("Hello!"),
            history: None,
            is_onboarded: true,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("history").is_none());
        assert_eq!(json["is_onboarded"], true);
        assert_eq!(json["message"]["role"], "ai");
    }

    #[test]
    fn onboarding_response_includes_history() {
        let resp = ChatResponse {
            message: view("Hi"),
            history: Some(vec![view("Hi")]),
            is_onboarded: false,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["history"].as_array().unwrap().len(), 1);
    }
}
