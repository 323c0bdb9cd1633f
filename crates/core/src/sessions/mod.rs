//! Sessions module - conversation sessions and their ordered messages.

mod sessions_model;
mod sessions_service;
mod sessions_traits;

pub use sessions_model::{
    derive_title, ChatMessage, ChatSession, MessageRole, RENAMED_TITLE_MAX_CHARS, TITLE_MAX_CHARS,
};
pub use sessions_service::SessionService;
pub use sessions_traits::{SessionRepositoryTrait, SessionServiceTrait};
