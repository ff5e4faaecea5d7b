//! User profile and onboarding data models.

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-reported English proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    /// All levels, in the order they are matched against free text.
    pub const ALL: [ProficiencyLevel; 3] = [
        ProficiencyLevel::Beginner,
        ProficiencyLevel::Intermediate,
        ProficiencyLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown proficiency level: {other}")),
        }
    }
}

/// Persisted per-user learning profile.
///
/// Created at signup with `is_onboarded = false` and both learning fields
/// unset. Only the onboarding flow writes to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub english_level: Option<ProficiencyLevel>,
    pub learning_goal: Option<String>,
    pub is_onboarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile for a newly registered user.
    pub fn new(username: impl Into<String>, full_name: Option<String>) -> Self {
        // Match the store's microsecond precision.
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            full_name,
            english_level: None,
            learning_goal: None,
            is_onboarded: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name used when addressing the user: full name if set, else username.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Profile fields to commit after an onboarding turn.
///
/// `None` leaves a field untouched. `onboarded` can only raise the flag;
/// the store never lowers it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub learning_goal: Option<String>,
    pub english_level: Option<ProficiencyLevel>,
    pub onboarded: bool,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.learning_goal.is_none() && self.english_level.is_none() && !self.onboarded
    }

    /// Apply to an in-memory profile with the same semantics the store uses.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(ref goal) = self.learning_goal {
            profile.learning_goal = Some(goal.clone());
        }
        if let Some(level) = self.english_level {
            profile.english_level = Some(level);
        }
        profile.is_onboarded |= self.onboarded;
    }
}
