//! Fixed onboarding reply templates.
//!
//! Onboarding never calls the model: every reply is one of these templates,
//! chosen by the inferred step and the user's latest message.

use super::classify::{is_valid_goal_reply, is_valid_level_reply};
use super::state::OnboardingStep;

/// Greeting plus the goal question.
pub fn welcome_prompt(name: &str) -> String {
    format!("Hi {name}! Welcome to Japi. What's your English learning goal?")
}

/// Goal accepted; ask for the level.
pub fn level_prompt(name: &str) -> String {
    format!(
        "That's a great goal, {name}! What is your current English level? \
         (Beginner/Intermediate/Advanced)"
    )
}

/// Goal reply was not usable; ask again with an example.
pub fn goal_clarification_prompt(name: &str) -> String {
    format!(
        "Hi {name}! To help you better, could you tell me what you'd like to achieve \
         with your English? For example: 'I want to improve my speaking skills'"
    )
}

/// Level accepted.
pub const READY_TO_BEGIN: &str = "Got it! Let's begin with a practice conversation.";

/// Level reply was not usable; ask again.
pub const LEVEL_CLARIFICATION: &str = "I'm not sure I understand. Could you please tell me \
     your current English level? (Beginner/Intermediate/Advanced)";

/// Nothing left to ask.
pub const OPEN_TOPIC_PROMPT: &str =
    "Let's start our English practice! What would you like to talk about?";

/// Choose the onboarding reply for `step` given the user's latest message.
pub fn onboarding_reply(step: OnboardingStep, name: &str, user_message: &str) -> String {
    match step {
        OnboardingStep::Welcome => welcome_prompt(name),
        OnboardingStep::AskGoal if is_valid_goal_reply(user_message) => level_prompt(name),
        OnboardingStep::AskGoal => goal_clarification_prompt(name),
        OnboardingStep::AskLevel if is_valid_level_reply(user_message) => {
            READY_TO_BEGIN.to_string()
        }
        OnboardingStep::AskLevel => LEVEL_CLARIFICATION.to_string(),
        OnboardingStep::Complete => OPEN_TOPIC_PROMPT.to_string(),
    }
}
