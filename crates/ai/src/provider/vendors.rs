//! The two supported vendors and the closed enum the registry hands out.

use async_trait::async_trait;
use smartdecision_core::configs::ProviderKind;

use super::client::OpenAiCompatibleClient;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use super::{ChatProvider, ChunkSink};
use crate::error::AiError;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const KIMI_BASE_URL: &str = "https://api.moonshot.cn";

#[derive(Debug, Clone)]
pub struct DeepSeekClient(OpenAiCompatibleClient);

impl DeepSeekClient {
    /// `base_url` falls back to the public DeepSeek endpoint.
    pub fn new(http: reqwest::Client, api_key: &str, base_url: Option<&str>) -> Self {
        Self(OpenAiCompatibleClient::new(
            http,
            base_url.unwrap_or(DEEPSEEK_BASE_URL),
            api_key,
            ProviderKind::DeepSeek.as_str(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct KimiClient(OpenAiCompatibleClient);

impl KimiClient {
    /// `base_url` falls back to the public Moonshot endpoint.
    pub fn new(http: reqwest::Client, api_key: &str, base_url: Option<&str>) -> Self {
        Self(OpenAiCompatibleClient::new(
            http,
            base_url.unwrap_or(KIMI_BASE_URL),
            api_key,
            ProviderKind::Kimi.as_str(),
        ))
    }
}

/// Closed set of provider clients.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    DeepSeek(DeepSeekClient),
    Kimi(KimiClient),
}

impl ProviderClient {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::DeepSeek(_) => ProviderKind::DeepSeek,
            ProviderClient::Kimi(_) => ProviderKind::Kimi,
        }
    }

    fn inner(&self) -> &OpenAiCompatibleClient {
        match self {
            ProviderClient::DeepSeek(client) => &client.0,
            ProviderClient::Kimi(client) => &client.0,
        }
    }

    pub fn base_url(&self) -> &str {
        self.inner().base_url()
    }
}

#[async_trait]
impl ChatProvider for ProviderClient {
    fn name(&self) -> &str {
        self.inner().label()
    }

    async fn complete(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AiError> {
        self.inner().complete(request).await
    }

    async fn stream_complete(
        &self,
        request: ChatCompletionRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<(), AiError> {
        self.inner().stream_complete(request, on_chunk).await
    }
}
