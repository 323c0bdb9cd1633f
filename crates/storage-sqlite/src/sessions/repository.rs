use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use smartdecision_core::errors::{Error, Result};
use smartdecision_core::sessions::{ChatMessage, ChatSession, SessionRepositoryTrait};

use super::model::{ChatMessageDB, ChatSessionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{chat_messages, chat_sessions};
use crate::utils::{format_timestamp, parse_timestamp, truncate_to_micros};

pub struct SessionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SessionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SessionRepository { pool, writer }
    }
}

fn session_not_found(session_id: &str) -> Error {
    Error::not_found(format!("Chat session {}", session_id))
}

fn load_session(conn: &mut SqliteConnection, session_id: &str) -> Result<ChatSession> {
    chat_sessions::table
        .find(session_id)
        .select(ChatSessionDB::as_select())
        .first::<ChatSessionDB>(conn)
        .optional()
        .into_core()?
        .map(ChatSession::from)
        .ok_or_else(|| session_not_found(session_id))
}

#[async_trait]
impl SessionRepositoryTrait for SessionRepository {
    fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        let mut conn = get_connection(&self.pool)?;
        load_session(&mut conn, session_id)
    }

    fn list_sessions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ChatSession>, i64)> {
        let mut conn = get_connection(&self.pool)?;
        let total = chat_sessions::table
            .filter(chat_sessions::user_id.eq(user_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .into_core()?;
        let rows = chat_sessions::table
            .filter(chat_sessions::user_id.eq(user_id))
            .order((chat_sessions::updated_at.desc(), chat_sessions::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(ChatSessionDB::as_select())
            .load::<ChatSessionDB>(&mut conn)
            .into_core()?;
        Ok((rows.into_iter().map(ChatSession::from).collect(), total))
    }

    fn list_messages(
        &self,
        session_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ChatMessage>, i64)> {
        let mut conn = get_connection(&self.pool)?;
        let total = chat_messages::table
            .filter(chat_messages::session_id.eq(session_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .into_core()?;
        let rows = chat_messages::table
            .filter(chat_messages::session_id.eq(session_id))
            .order((chat_messages::created_at.asc(), chat_messages::id.asc()))
            .limit(limit)
            .offset(offset)
            .select(ChatMessageDB::as_select())
            .load::<ChatMessageDB>(&mut conn)
            .into_core()?;
        Ok((rows.into_iter().map(ChatMessage::from).collect(), total))
    }

    fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = chat_messages::table
            .filter(chat_messages::session_id.eq(session_id))
            .order((chat_messages::created_at.asc(), chat_messages::id.asc()))
            .select(ChatMessageDB::as_select())
            .load::<ChatMessageDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn create_session(&self, session: ChatSession) -> Result<ChatSession> {
        let row = ChatSessionDB::from(&session);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChatSession> {
                diesel::insert_into(chat_sessions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row.into())
            })
            .await
    }

    async fn append_message(&self, message: ChatMessage) -> Result<ChatMessage> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChatMessage> {
                let mut message = message;
                let latest = chat_messages::table
                    .filter(chat_messages::session_id.eq(&message.session_id))
                    .select(max(chat_messages::created_at))
                    .first::<Option<String>>(conn)
                    .map_err(StorageError::from)?;

                message.created_at = truncate_to_micros(message.created_at);
                if let Some(latest) = latest.as_deref().map(parse_timestamp) {
                    if message.created_at <= latest {
                        message.created_at = latest + Duration::microseconds(1);
                    }
                }
                let row = ChatMessageDB::from(&message);

                let touched = diesel::update(chat_sessions::table.find(&message.session_id))
                    .set((
                        chat_sessions::last_message.eq(&message.content),
                        chat_sessions::updated_at.eq(&row.created_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if touched == 0 {
                    return Err(session_not_found(&message.session_id));
                }

                diesel::insert_into(chat_messages::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(message)
            })
            .await
    }

    async fn rename_session(&self, session_id: &str, title: String) -> Result<ChatSession> {
        let session_id = session_id.to_string();
        let now = format_timestamp(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChatSession> {
                let updated = diesel::update(chat_sessions::table.find(&session_id))
                    .set((
                        chat_sessions::title.eq(&title),
                        chat_sessions::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(session_not_found(&session_id));
                }
                load_session(conn, &session_id)
            })
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(
                    chat_messages::table.filter(chat_messages::session_id.eq(&session_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(diesel::delete(chat_sessions::table.find(&session_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
