//! Natural-language agent for sqlchat.
//!
//! The rest of the application treats the agent as opaque: hand it a
//! question and an event sink, get back an answer or a single uniform
//! error. How the answer is produced is this module's business.

mod groq;
mod mock;
mod parser;
mod prompt;
mod service;

pub use groq::{GroqClient, GroqConfig};
pub use mock::{FailingResponder, MockLlmClient, MockResponder};
pub use parser::extract_sql;
pub use prompt::{build_messages, PromptCache};
pub use service::SqlAgent;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Role of a message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Progress events emitted while a question is being answered.
///
/// Events flow through a side channel independent of the final-answer
/// return path, so the UI can show live activity without touching the
/// transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A streamed fragment of the model's reply.
    Thinking(String),
    /// The SQL query extracted from the reply.
    Sql(String),
    /// The query was sent to the database.
    Executing,
    /// The query returned this many rows.
    Rows(usize),
}

/// Sink for progress events.
///
/// An unbounded channel: the producer never blocks, and a dropped
/// receiver silently discards events rather than failing the request.
pub type EventSink = mpsc::UnboundedSender<AgentEvent>;

/// Sends an event, ignoring a closed sink.
pub fn emit(sink: &EventSink, event: AgentEvent) {
    let _ = sink.send(event);
}

/// Trait for LLM clients that can generate completions.
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Generates a completion for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Generates a streaming completion for the given messages.
    ///
    /// Returns a stream of response chunks as they arrive.
    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>>;
}

/// The opaque question-answering boundary.
///
/// One call per question. Progress goes to the sink; the answer (or one
/// uniform error) comes back on the return path. Implementations never
/// retry internally.
#[async_trait]
pub trait Responder: Send + Sync + std::fmt::Debug {
    async fn answer(&self, question: &str, events: &EventSink) -> Result<String>;
}
