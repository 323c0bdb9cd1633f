//! Chat orchestration for SmartDecision.
//!
//! This crate turns a user message into a provider call and a persisted
//! conversation turn:
//! - Provider clients for the OpenAI-compatible DeepSeek and Kimi APIs, with
//!   streaming over server-sent events
//! - A registry resolving provider names to clients
//! - Prompt assembly from history and retrieved knowledge
//! - The `ChatService` orchestrator, generic over a `ChatEnvironment`

pub mod chat;
pub mod env;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod types;

pub use chat::{ChatConfig, ChatService};
pub use env::{ChatEnvironment, ServiceEnvironment};
pub use error::AiError;
pub use provider::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatProvider,
    OpenAiCompatibleClient, ProviderClient, WireMessage,
};
pub use registry::{ProviderModels, ProviderRegistry, ProviderSettings};
pub use types::{ChatReply, ChatRequest};
