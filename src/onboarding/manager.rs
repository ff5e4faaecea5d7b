//! Onboarding turn planning: step inference, reply choice, and profile
//! commits for one user message.
//!
//! Everything here is pure. The chat service persists the outcome.

use tracing::debug;

use super::classify::extract_level;
use super::model::{ProfileUpdate, UserProfile};
use super::prompts::onboarding_reply;
use super::state::{ConversationTurn, LEVEL_OPTIONS_MARKER, OnboardingStep, infer_step};

/// Outcome of one onboarding turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingTurn {
    /// Step the user was answering.
    pub pre_step: OnboardingStep,
    /// Step after the assistant reply is appended.
    pub post_step: OnboardingStep,
    /// Assistant reply text.
    pub reply: String,
    /// Profile fields to commit.
    pub update: ProfileUpdate,
}

/// Plan the assistant's response to `user_message`.
///
/// `history` is the oldest-first window and already ends with the user's
/// message. `profile` is the state before this turn.
pub fn plan_turn(
    profile: &UserProfile,
    history: &[ConversationTurn],
    user_message: &str,
) -> OnboardingTurn {
    let pre_step = infer_step(history);
    let reply = onboarding_reply(pre_step, profile.display_name(), user_message);

    let mut with_reply = history.to_vec();
    with_reply.push(ConversationTurn::ai(reply.clone()));
    let post_step = infer_step(&with_reply);

    let update = profile_update(pre_step, post_step, user_message, &reply, profile);

    debug!(
        user_id = %profile.id,
        pre_step = %pre_step,
        post_step = %post_step,
        commits = !update.is_empty(),
        "Planned onboarding turn"
    );

    OnboardingTurn {
        pre_step,
        post_step,
        reply,
        update,
    }
}

/// Profile commits implied by a step transition.
///
/// - AskGoal → AskLevel commits the raw user message as the goal.
/// - Answering AskLevel commits the extracted level, unless the level is
///   already set or the reply re-asks for it.
/// - Goal and level both present marks the user onboarded.
pub fn profile_update(
    pre_step: OnboardingStep,
    post_step: OnboardingStep,
    user_message: &str,
    reply: &str,
    profile: &UserProfile,
) -> ProfileUpdate {
    let mut update = ProfileUpdate::default();

    if pre_step == OnboardingStep::AskGoal && post_step == OnboardingStep::AskLevel {
        update.learning_goal = Some(user_message.to_string());
    }

    if pre_step == OnboardingStep::AskLevel
        && profile.english_level.is_none()
        && !reasks_level(reply)
    {
        update.english_level = extract_level(user_message);
    }

    let mut after = profile.clone();
    update.apply_to(&mut after);
    if after.learning_goal.is_some() && after.english_level.is_some() && !profile.is_onboarded {
        update.onboarded = true;
    }

    update
}

fn reasks_level(reply: &str) -> bool {
    reply.to_lowercase().contains(LEVEL_OPTIONS_MARKER)
}
