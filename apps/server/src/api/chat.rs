//! Chat completion endpoints.
//!
//! `POST /chat/stream` answers with server-sent events: one
//! `{"content", "done": false}` event per fragment, then a terminal
//! `{"done": true, "sessionId"}` or `{"done": true, "error", "code"}` event.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use smartdecision_ai::{AiError, ChatRequest};
use smartdecision_core::sessions::ChatMessage;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub knowledge_ids: Vec<String>,
}

impl ChatBody {
    fn into_request(self, user_id: String) -> ChatRequest {
        ChatRequest {
            user_id,
            session_id: self.session_id,
            message: self.message,
            config_id: self.config_id,
            knowledge_ids: self.knowledge_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub session_id: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ChatBody>,
) -> ApiResult<Json<ChatResponse>> {
    let reply = state
        .chat_service
        .complete(body.into_request(user_id))
        .await?;
    Ok(Json(ChatResponse {
        message: reply.message,
        session_id: reply.session.id,
    }))
}

fn data_event(payload: serde_json::Value) -> Event {
    Event::default().data(payload.to_string())
}

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ChatBody>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let chat = state.chat_service.clone();
    let request = body.into_request(user_id);

    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let forward = move |text: &str| {
            chunk_tx
                .send(data_event(json!({ "content": text, "done": false })))
                .map_err(|_| AiError::Cancelled)
        };

        let result = tokio::select! {
            result = chat.stream_complete(request, forward) => result,
            _ = tx.closed() => {
                tracing::info!("Client disconnected, cancelling chat stream");
                return;
            }
        };

        let terminal = match result {
            Ok(reply) => json!({ "done": true, "sessionId": reply.session.id }),
            Err(AiError::Cancelled) => {
                tracing::info!("Chat stream cancelled by the client");
                return;
            }
            Err(e) => {
                tracing::warn!("Chat stream failed: {}", e);
                json!({ "done": true, "error": e.to_string(), "code": e.code() })
            }
        };
        let _ = tx.send(data_event(terminal));
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Routes exempt from the request timeout.
pub fn streaming_router() -> Router<Arc<AppState>> {
    Router::new().route("/chat/stream", post(chat_stream))
}
