use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

/// Per-conversation state, created on first contact and discarded on the
/// reset command. Owning this per session (instead of one process-wide
/// history) keeps concurrent chats independent.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub messages: Vec<ConversationMessage>,
    pub last_system_note: Option<String>,
}
