//! Persistence layer: libSQL-backed storage for user profiles and chat logs.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ConversationMessage, Database, MessageRole};
