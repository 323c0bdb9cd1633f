//! Database models for chat sessions and messages.

use diesel::prelude::*;
use log::warn;

use smartdecision_core::sessions::{ChatMessage, ChatSession, MessageRole};

use crate::schema::{chat_messages, chat_sessions};
use crate::utils::{format_timestamp, parse_timestamp};

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = chat_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChatSessionDB {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub last_message: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Identifiable, Insertable, Associations, Selectable, PartialEq, Debug, Clone)]
#[diesel(belongs_to(ChatSessionDB, foreign_key = session_id))]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChatMessageDB {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl From<ChatSessionDB> for ChatSession {
    fn from(db: ChatSessionDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            title: db.title,
            last_message: db.last_message,
            created_at: parse_timestamp(&db.created_at),
            updated_at: parse_timestamp(&db.updated_at),
        }
    }
}

impl From<&ChatSession> for ChatSessionDB {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            title: session.title.clone(),
            last_message: session.last_message.clone(),
            created_at: format_timestamp(session.created_at),
            updated_at: format_timestamp(session.updated_at),
        }
    }
}

impl From<ChatMessageDB> for ChatMessage {
    fn from(db: ChatMessageDB) -> Self {
        // The column is constrained to known roles.
        let role = db.role.parse::<MessageRole>().unwrap_or_else(|e| {
            warn!("Message {} has an invalid role: {}", db.id, e);
            MessageRole::Assistant
        });
        Self {
            id: db.id,
            session_id: db.session_id,
            role,
            content: db.content,
            created_at: parse_timestamp(&db.created_at),
        }
    }
}

impl From<&ChatMessage> for ChatMessageDB {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            session_id: message.session_id.clone(),
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            created_at: format_timestamp(message.created_at),
        }
    }
}
