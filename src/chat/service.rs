//! Chat service: runs one conversation turn end to end.
//!
//! Persists the user's message, routes it to the onboarding script or to the
//! free-chat responder depending on the stored `is_onboarded` flag, persists
//! the reply, and returns the client view.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::free_chat::FreeChatResponder;
use super::locks::UserLocks;
use super::model::{ChatResponse, MessageView};
use crate::error::{ChatError, Result};
use crate::llm::LlmProvider;
use crate::onboarding::{ConversationTurn, UserProfile, plan_turn};
use crate::store::{ConversationMessage, Database, MessageRole};

/// Messages read to infer the onboarding step.
pub const ONBOARDING_HISTORY_WINDOW: usize = 10;

/// Messages read as context for a free-chat reply.
pub const FREE_CHAT_CONTEXT_WINDOW: usize = 1;

/// Messages returned alongside an onboarding reply.
pub const RESPONSE_HISTORY_LIMIT: usize = 20;

/// Upper bound on a single history page.
pub const MAX_HISTORY_LIMIT: usize = 100;

pub struct ChatService {
    db: Arc<dyn Database>,
    free_chat: FreeChatResponder,
    locks: Option<UserLocks>,
}

impl ChatService {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            db,
            free_chat: FreeChatResponder::new(llm),
            locks: None,
        }
    }

    /// Serialize `send_message` and `clear_history` per user.
    pub fn with_per_user_locks(mut self) -> Self {
        self.locks = Some(UserLocks::new());
        self
    }

    /// Handle one inbound message from `user_id`.
    pub async fn send_message(&self, user_id: Uuid, content: &str) -> Result<ChatResponse> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage.into());
        }

        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(user_id).await),
            None => None,
        };

        let profile = self.load_profile(user_id).await?;
        let stored = self
            .db
            .append_message(user_id, MessageRole::User, content)
            .await?;

        if profile.is_onboarded {
            self.free_chat_turn(profile).await
        } else {
            self.onboarding_turn(profile, stored).await
        }
    }

    /// The latest `limit` messages, oldest first.
    pub async fn get_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<MessageView>> {
        self.load_profile(user_id).await?;

        let messages = self
            .db
            .recent_messages(user_id, limit.min(MAX_HISTORY_LIMIT))
            .await?;
        Ok(messages.into_iter().map(MessageView::from).collect())
    }

    /// Delete every message of `user_id`. The profile is kept.
    pub async fn clear_history(&self, user_id: Uuid) -> Result<()> {
        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(user_id).await),
            None => None,
        };

        self.load_profile(user_id).await?;
        let deleted = self.db.clear_messages(user_id).await?;
        info!(user_id = %user_id, deleted, "Chat history cleared");
        Ok(())
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| ChatError::UserNotFound(user_id).into())
    }

    async fn onboarding_turn(
        &self,
        profile: UserProfile,
        stored: ConversationMessage,
    ) -> Result<ChatResponse> {
        let user_id = profile.id;
        let window = self
            .db
            .recent_messages(user_id, ONBOARDING_HISTORY_WINDOW)
            .await?;

        let mut history: Vec<ConversationTurn> = window.iter().map(ConversationTurn::from).collect();
        if !window.iter().any(|m| m.id == stored.id) {
            history.push(ConversationTurn::from(&stored));
        }

        let turn = plan_turn(&profile, &history, &stored.content);

        // The reply goes in first: a turn whose reply was lost must not
        // leave a committed profile change behind.
        let reply = self
            .db
            .append_message(user_id, MessageRole::Ai, &turn.reply)
            .await?;

        let is_onboarded = if turn.update.is_empty() {
            profile.is_onboarded
        } else {
            let updated = self.db.update_profile(user_id, &turn.update).await?;
            if updated.is_onboarded && !profile.is_onboarded {
                info!(
                    user_id = %user_id,
                    level = ?updated.english_level,
                    "Onboarding complete"
                );
            }
            updated.is_onboarded
        };

        let recent = self
            .db
            .recent_messages(user_id, RESPONSE_HISTORY_LIMIT)
            .await?;

        debug!(
            user_id = %user_id,
            step = %turn.pre_step,
            next = %turn.post_step,
            "Onboarding turn handled"
        );

        Ok(ChatResponse {
            message: reply.into(),
            history: Some(recent.into_iter().map(MessageView::from).collect()),
            is_onboarded,
        })
    }

    async fn free_chat_turn(&self, profile: UserProfile) -> Result<ChatResponse> {
        let context = self
            .db
            .recent_messages(profile.id, FREE_CHAT_CONTEXT_WINDOW)
            .await?;

        let reply = self
            .free_chat
            .respond(&context, profile.english_level)
            .await;

        let reply = self
            .db
            .append_message(profile.id, MessageRole::Ai, &reply)
            .await?;

        Ok(ChatResponse {
            message: reply.into(),
            history: None,
            is_onboarded: true,
        })
    }
}
