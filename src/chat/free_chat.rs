//! Free-chat responder: LLM-backed tutoring once onboarding is done.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::onboarding::ProficiencyLevel;
use crate::store::{ConversationMessage, MessageRole};

/// Number of history entries forwarded to the model.
pub const FREE_CHAT_WINDOW: usize = 10;

/// Temperature for free-chat replies.
pub const FREE_CHAT_TEMPERATURE: f32 = 0.7;

/// Output token cap for free-chat replies.
pub const FREE_CHAT_MAX_TOKENS: u32 = 200;

/// Reply returned whenever the provider cannot produce one.
pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble generating a response. Could you please rephrase that or try again later?";

const BASE_SYSTEM_PROMPT: &str = "You are Japi, an AI English tutor. Your role is to help users improve their English skills through conversation.
- Be friendly, patient, and encouraging
- Correct mistakes in a constructive way
- Adapt your language to the user's level (Beginner/Intermediate/Advanced)
- Focus on practical, conversational English
- Keep responses concise and natural
- If the user makes a mistake, first repeat their sentence correctly, then explain the correction
- Ask follow-up questions to keep the conversation going";

/// Builds system instructions and asks the model for a tutoring reply.
pub struct FreeChatResponder {
    llm: Arc<dyn LlmProvider>,
}

impl FreeChatResponder {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Generate a reply for an onboarded user.
    ///
    /// Never fails: provider errors and empty completions yield
    /// [`FALLBACK_REPLY`].
    pub async fn respond(
        &self,
        history: &[ConversationMessage],
        level: Option<ProficiencyLevel>,
    ) -> String {
        let request = build_request(history, level);

        match self.llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                debug!(
                    model = self.llm.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Free chat reply generated"
                );
                response.content
            }
            Ok(_) => {
                warn!(model = self.llm.model_name(), "Free chat reply was empty");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                warn!(model = self.llm.model_name(), error = %e, "Free chat generation failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

/// System instruction for the given level.
pub fn system_prompt(level: Option<ProficiencyLevel>) -> String {
    let Some(level) = level else {
        return BASE_SYSTEM_PROMPT.to_string();
    };

    let guidance = match level {
        ProficiencyLevel::Beginner => {
            "Use simple vocabulary and short sentences. Focus on basic grammar and common phrases."
        }
        ProficiencyLevel::Intermediate => {
            "Use a wider range of vocabulary and slightly more complex sentences. Gently correct mistakes and explain when needed."
        }
        ProficiencyLevel::Advanced => {
            "Use natural, idiomatic English. Focus on fluency, nuance, and more complex language structures."
        }
    };

    format!(
        "{BASE_SYSTEM_PROMPT}\nThe user has indicated they are at the {level} level. {guidance}"
    )
}

/// System instruction followed by the last [`FREE_CHAT_WINDOW`] messages.
fn build_request(
    history: &[ConversationMessage],
    level: Option<ProficiencyLevel>,
) -> CompletionRequest {
    let start = history.len().saturating_sub(FREE_CHAT_WINDOW);

    let mut messages = Vec::with_capacity(history.len() - start + 1);
    messages.push(ChatMessage::system(system_prompt(level)));
    for msg in &history[start..] {
        messages.push(match msg.role {
            MessageRole::Ai => ChatMessage::assistant(msg.content.clone()),
            _ => ChatMessage::user(msg.content.clone()),
        });
    }

    CompletionRequest::new(messages)
        .with_temperature(FREE_CHAT_TEMPERATURE)
        .with_max_tokens(FREE_CHAT_MAX_TOKENS)
}
