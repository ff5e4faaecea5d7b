//! User registration and profile lookup.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{ChatError, DatabaseError, Result};
use crate::onboarding::UserProfile;
use crate::store::Database;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;

pub struct UserService {
    db: Arc<dyn Database>,
}

impl UserService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Register a new user. The profile starts un-onboarded.
    pub async fn create(&self, username: &str, full_name: Option<String>) -> Result<UserProfile> {
        let username = username.trim();
        validate_username(username)?;

        if self.db.get_user_by_username(username).await?.is_some() {
            return Err(ChatError::UsernameTaken(username.to_string()).into());
        }

        let full_name = full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let profile = UserProfile::new(username, full_name);

        match self.db.create_user(&profile).await {
            Ok(()) => {}
            // Lost a race with a concurrent signup.
            Err(DatabaseError::Constraint(_)) => {
                return Err(ChatError::UsernameTaken(username.to_string()).into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %profile.id, username = %profile.username, "User registered");
        Ok(profile)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserProfile> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| ChatError::UserNotFound(id).into())
    }

    /// Delete a user together with their chat history.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.db.delete_user(id).await? {
            return Err(ChatError::UserNotFound(id).into());
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

fn validate_username(username: &str) -> std::result::Result<(), ChatError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ChatError::InvalidUsername(format!(
            "must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if let Some(c) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(ChatError::InvalidUsername(format!(
            "character '{c}' is not allowed"
        )));
    }
    Ok(())
}
