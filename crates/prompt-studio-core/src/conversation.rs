//! Conversation turns and the append-only log that records them
//!
//! These types don't depend on any UI framework and are shared by every
//! front-end.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Label shown next to the turn in the history view
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "AI",
        }
    }
}

/// A single turn in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: ChatRole,
    content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered history of turns. Only grows; nothing is ever removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationLog {
    turns: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, turn: ChatMessage) {
        self.turns.push(turn);
    }

    /// Append a user turn and its reply in a single update
    pub(crate) fn append_exchange(&mut self, user: ChatMessage, assistant: ChatMessage) {
        self.turns.reserve(2);
        self.append(user);
        self.append(assistant);
    }

    /// All turns in insertion order. The iterator is `Clone`, so a renderer can
    /// walk it more than once.
    pub fn all(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role() == ChatRole::Assistant)
    }
}
