//! Chat: one conversation turn from inbound message to persisted reply.

pub mod free_chat;
pub mod locks;
pub mod model;
mod routes;
pub mod service;

pub use free_chat::{FALLBACK_REPLY, FreeChatResponder};
pub use locks::UserLocks;
pub use model::{ChatResponse, HistoryQuery, MessageView};
pub use routes::chat_routes;
pub use service::ChatService;
