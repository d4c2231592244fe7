//! Mock model clients and responders for testing.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::agent::{emit, AgentEvent, EventSink, LlmClient, Message, Responder};
use crate::error::{ChatError, Result};

/// Model client returning a canned response.
///
/// Records every request so tests can assert on what was sent. The
/// streaming variant delivers the response in word-sized chunks.
#[derive(Debug)]
pub struct MockLlmClient {
    response: String,
    failure: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a mock that answers with a simple SQL reply.
    pub fn new() -> Self {
        Self::with_response("```sql\nSELECT * FROM student;\n```")
    }

    /// Creates a mock with the given canned response.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that fails every request with an agent error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: String::new(),
            failure: Some(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the recorded requests.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, messages: &[Message]) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.record(messages);
        match &self.failure {
            Some(message) => Err(ChatError::agent(message.clone())),
            None => Ok(self.response.clone()),
        }
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        self.record(messages);
        if let Some(message) = &self.failure {
            return Err(ChatError::agent(message.clone()));
        }

        let chunks: Vec<Result<String>> = self
            .response
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();

        Ok(stream::iter(chunks).boxed())
    }
}

/// Responder returning a canned answer.
#[derive(Debug)]
pub struct MockResponder {
    answer: String,
    questions: Mutex<Vec<String>>,
}

impl MockResponder {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Returns the questions asked so far.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn answer(&self, question: &str, events: &EventSink) -> Result<String> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(question.to_string());
        }
        emit(events, AgentEvent::Thinking(self.answer.clone()));
        Ok(self.answer.clone())
    }
}

/// Responder that fails every question.
#[derive(Debug)]
pub struct FailingResponder {
    message: String,
}

impl FailingResponder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Responder for FailingResponder {
    async fn answer(&self, _question: &str, _events: &EventSink) -> Result<String> {
        Err(ChatError::agent(self.message.clone()))
    }
}
