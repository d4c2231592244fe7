//! Chat session transcript.
//!
//! An append-only list of user/assistant messages owned by one session.
//! The transcript is presentation state: it is rendered verbatim and is
//! not fed back to the model.

/// Greeting shown when a session starts or is reset.
pub const GREETING: &str = "How can I help you?";

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub role: ChatRole,
    pub content: String,
}

impl SessionMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered message history for one chat session.
///
/// A fresh store holds exactly one assistant greeting. Messages are only
/// ever appended; `reset` is the single destructive operation and returns
/// the store to its initial state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    messages: Vec<SessionMessage>,
}

impl SessionStore {
    /// Creates a store containing the assistant greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![SessionMessage::new(ChatRole::Assistant, GREETING)],
        }
    }

    /// Appends a user message.
    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(SessionMessage::new(ChatRole::User, content));
    }

    /// Appends an assistant message.
    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages
            .push(SessionMessage::new(ChatRole::Assistant, content));
    }

    /// Returns all messages in insertion order.
    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    /// Returns the number of messages, greeting included.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the greeting is never removed outside of `reset`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Discards the history and restores the greeting.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages
            .push(SessionMessage::new(ChatRole::Assistant, GREETING));
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
