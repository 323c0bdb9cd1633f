//! Orchestrator request and reply types.

use serde::{Deserialize, Serialize};
use smartdecision_core::sessions::{ChatMessage, ChatSession};

/// One user turn to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    /// Absent, `""` or `"0"` starts a new session.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    /// Absent or `"0"` uses the user's default config.
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub knowledge_ids: Vec<String>,
}

/// The stored assistant turn and the session after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: ChatMessage,
    pub session: ChatSession,
}
