//! Japi: AI English tutor backend with a scripted onboarding conversation.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod store;
pub mod users;
