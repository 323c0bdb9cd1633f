//! HTTP client for OpenAI-compatible chat-completion endpoints.

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use reqwest::header::ACCEPT;

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};
use super::{ChatProvider, ChunkSink};
use crate::error::AiError;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const DONE_MARKER: &str = "[DONE]";

/// Stateless client for one OpenAI-compatible vendor.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    label: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            label: label.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPLETIONS_PATH)
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response, AiError> {
        let mut builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request);
        if request.stream {
            builder = builder.header(ACCEPT, "text/event-stream");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AiError::upstream(None, format!("{} request failed: {}", self.label, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", self.label, status, body);
            return Err(AiError::upstream(Some(status.as_u16()), body));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AiError> {
        request.stream = false;
        debug!("{} completion with model {}", self.label, request.model);

        let response = self.send(&request).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::upstream(Some(status), format!("Failed to read body: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            warn!("{} sent an undecodable reply: {}", self.label, e);
            AiError::upstream(Some(status), body)
        })
    }

    async fn stream_complete(
        &self,
        mut request: ChatCompletionRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<(), AiError> {
        request.stream = true;
        debug!("{} streaming with model {}", self.label, request.model);

        let response = self.send(&request).await?;
        let status = response.status().as_u16();
        forward_events(response.bytes_stream(), Some(status), on_chunk).await
    }
}

/// Decodes an SSE byte stream and hands each completion fragment to `on_chunk`.
///
/// `[DONE]` ends the stream; so does the end of the body. Events with no data
/// are skipped.
pub(crate) async fn forward_events<S, B, E>(
    bytes: S,
    status: Option<u16>,
    on_chunk: &mut ChunkSink<'_>,
) -> Result<(), AiError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut events = std::pin::pin!(bytes.eventsource());

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| AiError::upstream(status, format!("Stream broke: {}", e)))?;
        let data = event.data.trim();
        if data.is_empty() {
            continue;
        }
        if data == DONE_MARKER {
            return Ok(());
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(data).map_err(|e| {
            AiError::upstream(status, format!("Malformed fragment ({}): {}", e, data))
        })?;
        on_chunk(chunk)?;
    }

    debug!("Stream ended without a [DONE] marker");
    Ok(())
}
