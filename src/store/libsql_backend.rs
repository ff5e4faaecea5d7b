//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases over a single shared
//! connection.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::model::{ProficiencyLevel, ProfileUpdate, UserProfile};
use crate::store::migrations;
use crate::store::traits::{ConversationMessage, Database, MessageRole};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Timestamp of the user's newest message, if any.
    async fn latest_message_time(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT MAX(created_at) FROM chat_messages WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_message_time: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let latest: Option<String> = row.get(0).ok();
                Ok(latest.map(|s| parse_datetime(&s)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("latest_message_time: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format: RFC 3339, UTC, microsecond precision.
///
/// Fixed width, so lexical order in SQL equals chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str, column: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::Serialization(format!("invalid {column} '{s}': {e}")))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

const USER_COLUMNS: &str =
    "id, username, full_name, english_level, learning_goal, is_onboarded, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, user_id, role, content, created_at";

/// Map a libsql Row to a UserProfile.
fn row_to_user(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Serialization(format!("user row: {e}"));

    let id_str: String = row.get(0).map_err(get_err)?;
    let level_str: Option<String> = row.get(3).ok();
    let onboarded: i64 = row.get(5).map_err(get_err)?;
    let created_str: String = row.get(6).map_err(get_err)?;
    let updated_str: String = row.get(7).map_err(get_err)?;

    let english_level = match level_str {
        Some(s) => Some(
            s.parse::<ProficiencyLevel>()
                .map_err(DatabaseError::Serialization)?,
        ),
        None => None,
    };

    Ok(UserProfile {
        id: parse_uuid(&id_str, "user id")?,
        username: row.get(1).map_err(get_err)?,
        full_name: row.get(2).ok(),
        english_level,
        learning_goal: row.get(4).ok(),
        is_onboarded: onboarded != 0,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a ConversationMessage.
fn row_to_message(row: &libsql::Row) -> Result<ConversationMessage, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Serialization(format!("message row: {e}"));

    let id_str: String = row.get(0).map_err(get_err)?;
    let user_str: String = row.get(1).map_err(get_err)?;
    let role_str: String = row.get(2).map_err(get_err)?;
    let created_str: String = row.get(4).map_err(get_err)?;

    Ok(ConversationMessage {
        id: parse_uuid(&id_str, "message id")?,
        user_id: parse_uuid(&user_str, "user id")?,
        role: role_str
            .parse::<MessageRole>()
            .map_err(DatabaseError::Serialization)?,
        content: row.get(3).map_err(get_err)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::init_schema(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                profile.id.to_string(),
                profile.username.as_str(),
                opt_text(profile.full_name.as_deref()),
                opt_text(profile.english_level.as_ref().map(|l| l.as_str())),
                opt_text(profile.learning_goal.as_deref()),
                profile.is_onboarded as i64,
                format_datetime(&profile.created_at),
                format_datetime(&profile.updated_at),
            ],
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::Constraint(format!("username '{}' already exists", profile.username))
            } else {
                DatabaseError::Query(format!("create_user: {e}"))
            }
        })?;

        debug!(user_id = %profile.id, username = %profile.username, "Created user");
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user: {e}"))),
        }
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_by_username: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_by_username: {e}"))),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError> {
        let conn = self.conn();
        let now = format_datetime(&Utc::now());
        let count = conn
            .execute(
                "UPDATE users SET
                    learning_goal = COALESCE(?2, learning_goal),
                    english_level = COALESCE(?3, english_level),
                    is_onboarded = MAX(is_onboarded, ?4),
                    updated_at = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    opt_text(update.learning_goal.as_deref()),
                    opt_text(update.english_level.as_ref().map(|l| l.as_str())),
                    update.onboarded as i64,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_profile: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            });
        }

        debug!(
            user_id = %id,
            goal = update.learning_goal.is_some(),
            level = ?update.english_level,
            onboarded = update.onboarded,
            "Updated profile"
        );

        self.get_user(id).await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_user: {e}")))?;
        Ok(count > 0)
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn append_message(
        &self,
        user_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationMessage, DatabaseError> {
        // Keep per-user timestamps strictly increasing even if the clock
        // stalls or steps back.
        let mut created_at = Utc::now().trunc_subsecs(6);
        if let Some(latest) = self.latest_message_time(user_id).await? {
            if created_at <= latest {
                created_at = latest + Duration::microseconds(1);
            }
        }

        let message = ConversationMessage {
            id: Uuid::new_v4(),
            user_id,
            role,
            content: content.to_string(),
            created_at,
        };

        let conn = self.conn();
        conn.execute(
            &format!("INSERT INTO chat_messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                message.id.to_string(),
                user_id.to_string(),
                role.as_str(),
                content,
                format_datetime(&created_at),
            ],
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("FOREIGN KEY constraint failed") {
                DatabaseError::NotFound {
                    entity: "user".into(),
                    id: user_id.to_string(),
                }
            } else {
                DatabaseError::Query(format!("append_message: {e}"))
            }
        })?;

        Ok(message)
    }

    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2"
                ),
                params![user_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_message(&row) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    tracing::warn!("Skipping chat message row: {e}");
                }
            }
        }

        messages.reverse();
        Ok(messages)
    }

    async fn clear_messages(&self, user_id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM chat_messages WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("clear_messages: {e}")))?;

        debug!(user_id = %user_id, deleted = count, "Cleared chat history");
        Ok(count > 0)
    }
}
