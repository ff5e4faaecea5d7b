//! Lexical classifiers for onboarding replies.
//!
//! Plain substring tests against fixed phrase lists. These are exact,
//! reproducible heuristics, not language understanding.

use super::model::ProficiencyLevel;

/// Replies shorter than this (after trimming) never count as a goal.
const MIN_GOAL_LEN: usize = 5;

/// Non-committal phrases that disqualify a goal reply.
const GOAL_DENYLIST: &[&str] = &[
    "i don't know",
    "dunno",
    "not sure",
    "idk",
    "nothing",
    "i don't have one",
    "no idea",
    "not sure yet",
    "i don't care",
];

/// Whether `text` reads like an actual learning goal.
pub fn is_valid_goal_reply(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    if text.chars().count() < MIN_GOAL_LEN {
        return false;
    }
    !GOAL_DENYLIST.iter().any(|phrase| text.contains(phrase))
}

/// Whether `text` names one of the proficiency levels.
pub fn is_valid_level_reply(text: &str) -> bool {
    extract_level(text).is_some()
}

/// First level named in `text`, checked beginner → intermediate → advanced.
pub fn extract_level(text: &str) -> Option<ProficiencyLevel> {
    let text = text.to_lowercase();
    ProficiencyLevel::ALL
        .into_iter()
        .find(|level| text.contains(level.as_str()))
}
