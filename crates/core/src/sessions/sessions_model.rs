//! Session and message domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Titles derived from the first message keep at most this many code points.
pub const TITLE_MAX_CHARS: usize = 30;

/// Upper bound for titles set through a rename.
pub const RENAMED_TITLE_MAX_CHARS: usize = 100;

/// Takes the first `max_chars` code points of `message`.
pub fn derive_title(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => message[..byte_idx].to_string(),
        None => message.to_string(),
    }
}

/// A persisted conversation owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a session for `user_id` titled after its first message.
    pub fn new(user_id: &str, first_message: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            title: derive_title(first_message, TITLE_MAX_CHARS),
            last_message: first_message.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(Error::invalid_input(format!("Unknown role: {}", s))),
        }
    }
}

/// One turn of a session. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: &str, role: MessageRole, content: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn user(session_id: &str, content: &str) -> Self {
        Self::new(session_id, MessageRole::User, content)
    }

    pub fn assistant(session_id: &str, content: &str) -> Self {
        Self::new(session_id, MessageRole::Assistant, content)
    }
}
