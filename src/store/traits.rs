//! Unified `Database` trait, the single async interface for all persistence.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::model::{ProfileUpdate, UserProfile};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            "system" => Ok(Self::System),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// A persisted chat message. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering users and their chat log.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert a new user profile.
    async fn create_user(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// Get a user profile by ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;

    /// Get a user profile by username.
    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, DatabaseError>;

    /// Commit onboarding fields and return the stored profile.
    ///
    /// Unset fields are left alone and `is_onboarded` is never lowered.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError>;

    /// Delete a user and, by cascade, their messages.
    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Append a message to a user's log. The server assigns id and timestamp.
    async fn append_message(
        &self,
        user_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationMessage, DatabaseError>;

    /// The `limit` most recent messages for a user, oldest first.
    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, DatabaseError>;

    /// Delete all of a user's messages. Returns whether anything was deleted.
    async fn clear_messages(&self, user_id: Uuid) -> Result<bool, DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_matches_serde() {
        for role in [MessageRole::User, MessageRole::Ai, MessageRole::System] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(role.as_str().parse::<MessageRole>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("assistant".parse::<MessageRole>().is_err());
        assert!("".parse::<MessageRole>().is_err());
    }
}
