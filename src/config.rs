//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

/// Default location of the libSQL database file.
pub const DEFAULT_DB_PATH: &str = "./data/japi.db";

/// Default number of messages returned by `GET /chats`.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// Path of the local database file.
    pub db_path: String,
    /// HTTP listen port.
    pub port: u16,
    /// Which LLM backend serves free-chat replies.
    pub llm_backend: LlmBackend,
    /// Model identifier passed to the backend.
    pub model: String,
    pub api_key: SecretString,
    /// Serialize `send_message` / `clear_history` per user.
    pub serialize_per_user: bool,
    /// Default `limit` for history listings.
    pub history_limit: usize,
}

impl TutorConfig {
    /// Build config from environment variables.
    ///
    /// The API key variable depends on the backend: `OPENAI_API_KEY` for
    /// OpenAI, `ANTHROPIC_API_KEY` for Anthropic.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path =
            std::env::var("JAPI_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let port: u16 = match std::env::var("JAPI_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "JAPI_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            Err(_) => 8000,
        };

        let llm_backend = match std::env::var("JAPI_LLM_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => LlmBackend::OpenAi,
        };

        let key_var = llm_backend.api_key_var();
        let api_key = std::env::var(key_var)
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = std::env::var("JAPI_MODEL")
            .unwrap_or_else(|_| llm_backend.default_model().to_string());

        let serialize_per_user = std::env::var("JAPI_SERIALIZE_PER_USER")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let history_limit: usize = std::env::var("JAPI_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        Ok(Self {
            db_path,
            port,
            llm_backend,
            model,
            api_key,
            serialize_per_user,
            history_limit,
        })
    }
}
