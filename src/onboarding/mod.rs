//! Onboarding: the scripted first conversation that collects a learning
//! goal and a proficiency level before free chat begins.
//!
//! No step is persisted. Each turn re-derives the step from the message log
//! (`state`), picks a fixed reply (`prompts`), and works out which profile
//! fields the transition commits (`manager`).

pub mod classify;
pub mod manager;
pub mod model;
pub mod prompts;
pub mod state;

pub use classify::{extract_level, is_valid_goal_reply, is_valid_level_reply};
pub use manager::{OnboardingTurn, plan_turn, profile_update};
pub use model::{ProficiencyLevel, ProfileUpdate, UserProfile};
pub use state::{ConversationTurn, OnboardingStep, infer_step};
