use crate::errors::Result;
use crate::pagination::{Page, PageRequest};
use crate::sessions::sessions_model::{ChatMessage, ChatSession, MessageRole};
use async_trait::async_trait;

/// Trait for session/message repository operations.
#[async_trait]
pub trait SessionRepositoryTrait: Send + Sync {
    /// Returns `DatabaseError::NotFound` when absent.
    fn get_session(&self, session_id: &str) -> Result<ChatSession>;

    /// Sessions of a user, most recently updated first, with the total count.
    fn list_sessions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ChatSession>, i64)>;

    /// Messages of a session, oldest first, with the total count.
    fn list_messages(
        &self,
        session_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ChatMessage>, i64)>;

    /// Every message of a session, oldest first.
    fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    async fn create_session(&self, session: ChatSession) -> Result<ChatSession>;

    /// Inserts the message and refreshes the session's last-message snapshot
    /// in one transaction. The stored `created_at` is strictly greater than
    /// that of every earlier message of the session.
    async fn append_message(&self, message: ChatMessage) -> Result<ChatMessage>;

    async fn rename_session(&self, session_id: &str, title: String) -> Result<ChatSession>;

    /// Deletes the messages and the session in one transaction.
    async fn delete_session(&self, session_id: &str) -> Result<usize>;
}

/// Trait for session service operations.
#[async_trait]
pub trait SessionServiceTrait: Send + Sync {
    /// Loads the session when an id is given, otherwise starts a new one
    /// titled after `first_message`. `""` and `"0"` count as no id.
    async fn get_or_create_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        first_message: &str,
    ) -> Result<ChatSession>;

    async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage>;

    /// Full history of a session in chronological order.
    fn get_history(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    fn get_session(&self, user_id: &str, session_id: &str) -> Result<ChatSession>;

    fn list_sessions(&self, user_id: &str, page: PageRequest) -> Result<Page<ChatSession>>;

    fn list_messages(
        &self,
        user_id: &str,
        session_id: &str,
        page: PageRequest,
    ) -> Result<Page<ChatMessage>>;

    async fn rename_session(
        &self,
        user_id: &str,
        session_id: &str,
        title: &str,
    ) -> Result<ChatSession>;

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()>;
}
