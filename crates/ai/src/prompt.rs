//! Prompt assembly.

use smartdecision_core::sessions::{ChatMessage, MessageRole};

use crate::provider::WireMessage;

/// Baseline system prompt bundled with the crate.
pub const SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");

pub const KNOWLEDGE_HEADER: &str = "\n\n--- Reference knowledge ---\n";
pub const KNOWLEDGE_FOOTER: &str = "--- End of reference knowledge ---";

/// System prompt, optionally extended with retrieved knowledge.
pub fn system_message(knowledge: &str) -> String {
    let mut system = SYSTEM_PROMPT.trim_end().to_string();
    if !knowledge.is_empty() {
        system.push_str(KNOWLEDGE_HEADER);
        system.push_str(knowledge);
        system.push_str(KNOWLEDGE_FOOTER);
    }
    system
}

/// System message, then the history in order, then the new user turn.
pub fn build_messages(
    history: &[ChatMessage],
    knowledge: &str,
    user_message: &str,
) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage::system(system_message(knowledge)));
    messages.extend(history.iter().map(|m| match m.role {
        MessageRole::User => WireMessage::user(m.content.clone()),
        MessageRole::Assistant => WireMessage::assistant(m.content.clone()),
    }));
    messages.push(WireMessage::user(user_message));
    messages
}
