//! Onboarding step inference. Works out which step the user is in, read from history.
//!
//! The step is never stored. It is recomputed from the ordered message log
//! on every turn by looking at the most recent assistant prompt.

use serde::{Deserialize, Serialize};

use crate::store::{ConversationMessage, MessageRole};

/// The steps of the onboarding script.
///
/// Progresses Welcome → AskGoal → AskLevel; `Complete` is never inferred
/// from history but has its own reply template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Welcome,
    AskGoal,
    AskLevel,
    Complete,
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::AskGoal => "ask_goal",
            Self::AskLevel => "ask_level",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Phrases that identify an assistant message asking for the learning goal.
pub const GOAL_PROMPT_MARKERS: &[&str] = &[
    "what's your english learning goal",
    "what you'd like to achieve",
];

/// The option list every level prompt ends with.
pub const LEVEL_OPTIONS_MARKER: &str = "beginner/intermediate/advanced";

/// Phrases that identify an assistant message asking for the level.
pub const LEVEL_PROMPT_MARKERS: &[&str] = &[
    "what is your current english level",
    "tell me your current english level",
    LEVEL_OPTIONS_MARKER,
];

/// One `{role, content}` entry of the log fed to the inferencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Ai, content)
    }
}

impl From<&ConversationMessage> for ConversationTurn {
    fn from(msg: &ConversationMessage) -> Self {
        Self::new(msg.role, msg.content.clone())
    }
}

/// Infer the current onboarding step from an oldest-first log.
///
/// Only the latest assistant message matters. A goal prompt keeps the user
/// on `AskGoal` whether or not their reply was usable; advancing is decided
/// by comparing inference before and after the next assistant reply.
pub fn infer_step(history: &[ConversationTurn]) -> OnboardingStep {
    let Some(last_ai) = history.iter().rev().find(|t| t.role == MessageRole::Ai) else {
        return OnboardingStep::Welcome;
    };
    let last_ai = last_ai.content.to_lowercase();

    if contains_any(&last_ai, GOAL_PROMPT_MARKERS) {
        OnboardingStep::AskGoal
    } else if contains_any(&last_ai, LEVEL_PROMPT_MARKERS) {
        OnboardingStep::AskLevel
    } else {
        OnboardingStep::Welcome
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
