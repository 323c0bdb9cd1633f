//! SQLite storage implementation for chat sessions and messages.

mod model;
mod repository;

pub use model::{ChatMessageDB, ChatSessionDB};
pub use repository::SessionRepository;
