use super::sessions_model::{
    derive_title, ChatMessage, ChatSession, MessageRole, RENAMED_TITLE_MAX_CHARS,
};
use super::sessions_traits::{SessionRepositoryTrait, SessionServiceTrait};
use crate::errors::{Error, Result};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

pub struct SessionService {
    repository: Arc<dyn SessionRepositoryTrait>,
}

impl SessionService {
    pub fn new(repository: Arc<dyn SessionRepositoryTrait>) -> Self {
        SessionService { repository }
    }

    fn owned_session(&self, user_id: &str, session_id: &str) -> Result<ChatSession> {
        let session = self.repository.get_session(session_id)?;
        if session.user_id != user_id {
            return Err(Error::Forbidden(format!(
                "Session {} belongs to another user",
                session_id
            )));
        }
        Ok(session)
    }
}

fn is_new_session_marker(session_id: Option<&str>) -> bool {
    match session_id.map(str::trim) {
        None => true,
        Some(id) => id.is_empty() || id == "0",
    }
}

#[async_trait]
impl SessionServiceTrait for SessionService {
    async fn get_or_create_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        first_message: &str,
    ) -> Result<ChatSession> {
        if !is_new_session_marker(session_id) {
            let id = session_id.unwrap_or_default().trim();
            return self.owned_session(user_id, id);
        }

        let session = ChatSession::new(user_id, first_message);
        info!("Creating session {} for user {}", session.id, user_id);
        self.repository.create_session(session).await
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        debug!("Appending {} message to session {}", role, session_id);
        self.repository
            .append_message(ChatMessage::new(session_id, role, content))
            .await
    }

    fn get_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.repository.get_messages(session_id)
    }

    fn get_session(&self, user_id: &str, session_id: &str) -> Result<ChatSession> {
        self.owned_session(user_id, session_id)
    }

    fn list_sessions(&self, user_id: &str, page: PageRequest) -> Result<Page<ChatSession>> {
        let (sessions, total) =
            self.repository
                .list_sessions(user_id, page.limit(), page.offset())?;
        Ok(Page::new(sessions, total, page))
    }

    fn list_messages(
        &self,
        user_id: &str,
        session_id: &str,
        page: PageRequest,
    ) -> Result<Page<ChatMessage>> {
        self.owned_session(user_id, session_id)?;
        let (messages, total) =
            self.repository
                .list_messages(session_id, page.limit(), page.offset())?;
        Ok(Page::new(messages, total, page))
    }

    async fn rename_session(
        &self,
        user_id: &str,
        session_id: &str,
        title: &str,
    ) -> Result<ChatSession> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::invalid_input("Session title must not be empty"));
        }
        self.owned_session(user_id, session_id)?;
        self.repository
            .rename_session(session_id, derive_title(title, RENAMED_TITLE_MAX_CHARS))
            .await
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        self.owned_session(user_id, session_id)?;
        self.repository.delete_session(session_id).await?;
        info!("Deleted session {}", session_id);
        Ok(())
    }
}
