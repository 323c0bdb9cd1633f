//! Chat orchestration.
//!
//! A turn is prepared the same way for both entry points: resolve the config
//! and provider, load or start the session, gather history and knowledge,
//! build the prompt, and store the user turn. The assistant turn is stored only
//! when the provider finishes successfully.

use log::{debug, info, warn};
use smartdecision_core::{
    configs::AiConfig,
    pagination::{Page, PageRequest},
    sessions::{ChatMessage, ChatSession, MessageRole},
};
use std::sync::Arc;
use std::time::Duration;

use crate::env::ChatEnvironment;
use crate::error::AiError;
use crate::prompt::build_messages;
use crate::provider::{ChatCompletionChunk, ChatCompletionRequest, ChatProvider};
use crate::registry::ProviderModels;
use crate::types::{ChatReply, ChatRequest};

/// Timeouts applied around provider calls.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub complete_timeout: Duration,
    /// Applies to the whole stream, not to each fragment.
    pub stream_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            complete_timeout: Duration::from_secs(60),
            stream_timeout: Duration::from_secs(120),
        }
    }
}

struct PreparedTurn {
    session: ChatSession,
    provider: Arc<dyn ChatProvider>,
    request: ChatCompletionRequest,
}

pub struct ChatService<E: ChatEnvironment + 'static> {
    env: Arc<E>,
    config: ChatConfig,
}

impl<E: ChatEnvironment + 'static> ChatService<E> {
    pub fn new(env: Arc<E>, config: ChatConfig) -> Self {
        Self { env, config }
    }

    pub fn env(&self) -> &Arc<E> {
        &self.env
    }

    async fn resolve_config(
        &self,
        user_id: &str,
        config_id: Option<&str>,
    ) -> Result<AiConfig, AiError> {
        let configs = self.env.config_service();
        match config_id.map(str::trim) {
            None | Some("") | Some("0") => Ok(configs.get_default_config(user_id).await?),
            Some(id) => Ok(configs.get_config(user_id, id)?),
        }
    }

    async fn prepare(&self, request: &ChatRequest) -> Result<PreparedTurn, AiError> {
        if request.message.trim().is_empty() {
            return Err(AiError::invalid_input("Message must not be empty"));
        }
        let user_id = request.user_id.as_str();

        let config = self
            .resolve_config(user_id, request.config_id.as_deref())
            .await?;
        let provider = self.env.provider_registry().resolve(&config.provider)?;

        // Retrieval runs before the session exists so a failure leaves no
        // empty session behind.
        let knowledge = if request.knowledge_ids.is_empty() {
            String::new()
        } else {
            self.env
                .knowledge_service()
                .retrieve(user_id, &request.knowledge_ids)?
        };

        let sessions = self.env.session_service();
        let session = sessions
            .get_or_create_session(user_id, request.session_id.as_deref(), &request.message)
            .await?;
        let history = sessions.get_history(&session.id)?;

        let messages = build_messages(&history, &knowledge, &request.message);
        sessions
            .append_message(&session.id, MessageRole::User, &request.message)
            .await?;

        debug!(
            "Prepared turn for session {} with {} history message(s) via {}",
            session.id,
            history.len(),
            provider.name()
        );

        let mut completion = ChatCompletionRequest::new(config.model_name, messages);
        completion.temperature = Some(config.temperature);
        completion.max_tokens = Some(config.max_tokens);

        Ok(PreparedTurn {
            session,
            provider,
            request: completion,
        })
    }

    /// Stores the assistant turn and returns it with the refreshed session.
    async fn finish(
        &self,
        user_id: &str,
        session_id: &str,
        content: &str,
    ) -> Result<ChatReply, AiError> {
        let sessions = self.env.session_service();
        let message = sessions
            .append_message(session_id, MessageRole::Assistant, content)
            .await?;
        let session = sessions.get_session(user_id, session_id)?;
        Ok(ChatReply { message, session })
    }

    /// Sends one turn and waits for the whole reply.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatReply, AiError> {
        let turn = self.prepare(&request).await?;
        let timeout = self.config.complete_timeout;

        let response = match tokio::time::timeout(timeout, turn.provider.complete(turn.request))
            .await
        {
            Ok(result) => result.map_err(|e| {
                warn!("Completion failed for session {}: {}", turn.session.id, e);
                e
            })?,
            Err(_) => {
                warn!("Completion timed out for session {}", turn.session.id);
                return Err(AiError::Timeout(timeout));
            }
        };

        if response.choices.is_empty() {
            return Err(AiError::upstream(None, "Provider returned no choices"));
        }
        let content = response
            .text()
            .ok_or_else(|| AiError::upstream(None, "Provider returned a choice without content"))?
            .to_string();

        let reply = self
            .finish(&request.user_id, &turn.session.id, &content)
            .await?;
        info!("Completed turn for session {}", reply.session.id);
        Ok(reply)
    }

    /// Sends one turn and forwards the reply fragment by fragment.
    ///
    /// `on_chunk` sees every non-empty fragment in order; returning `Err` from
    /// it cancels the stream. Nothing but the user turn is stored unless the
    /// stream finishes.
    pub async fn stream_complete<F>(
        &self,
        request: ChatRequest,
        mut on_chunk: F,
    ) -> Result<ChatReply, AiError>
    where
        F: FnMut(&str) -> Result<(), AiError> + Send,
    {
        let turn = self.prepare(&request).await?;
        let timeout = self.config.stream_timeout;
        let mut buffer = String::new();

        let mut sink = |chunk: ChatCompletionChunk| -> Result<(), AiError> {
            let text = chunk.text();
            if text.is_empty() {
                return Ok(());
            }
            buffer.push_str(text);
            on_chunk(text)
        };

        let streamed =
            tokio::time::timeout(timeout, turn.provider.stream_complete(turn.request, &mut sink))
                .await;
        match streamed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Stream failed for session {}: {}", turn.session.id, e);
                return Err(e);
            }
            Err(_) => {
                warn!("Stream timed out for session {}", turn.session.id);
                return Err(AiError::Timeout(timeout));
            }
        }

        let reply = self
            .finish(&request.user_id, &turn.session.id, &buffer)
            .await?;
        info!(
            "Streamed {} char(s) for session {}",
            buffer.chars().count(),
            reply.session.id
        );
        Ok(reply)
    }

    pub fn list_sessions(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<ChatSession>, AiError> {
        Ok(self.env.session_service().list_sessions(user_id, page)?)
    }

    pub fn list_messages(
        &self,
        user_id: &str,
        session_id: &str,
        page: PageRequest,
    ) -> Result<Page<ChatMessage>, AiError> {
        Ok(self
            .env
            .session_service()
            .list_messages(user_id, session_id, page)?)
    }

    pub async fn rename_session(
        &self,
        user_id: &str,
        session_id: &str,
        title: &str,
    ) -> Result<ChatSession, AiError> {
        Ok(self
            .env
            .session_service()
            .rename_session(user_id, session_id, title)
            .await?)
    }

    pub async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<(), AiError> {
        Ok(self
            .env
            .session_service()
            .delete_session(user_id, session_id)
            .await?)
    }

    pub fn available_models(&self) -> Vec<ProviderModels> {
        self.env.provider_registry().available_models()
    }
}
