//! Chat-completion providers.
//!
//! DeepSeek and Kimi both speak the OpenAI chat-completion dialect, so one
//! HTTP client serves both; the vendor types only pin the base URL and label.

mod client;
mod types;
mod vendors;

pub use client::OpenAiCompatibleClient;
pub use types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ChoiceMessage,
    Usage, WireMessage,
};
pub use vendors::{
    DeepSeekClient, KimiClient, ProviderClient, DEEPSEEK_BASE_URL, KIMI_BASE_URL,
};

use async_trait::async_trait;

use crate::error::AiError;

/// Callback receiving streamed fragments. Returning `Err` aborts the stream.
pub type ChunkSink<'a> = dyn FnMut(ChatCompletionChunk) -> Result<(), AiError> + Send + 'a;

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider label used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: ChatCompletionRequest)
        -> Result<ChatCompletionResponse, AiError>;

    /// Streams the reply, handing each fragment to `on_chunk` in order.
    async fn stream_complete(
        &self,
        request: ChatCompletionRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<(), AiError>;
}
