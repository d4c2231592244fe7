//! Core chat context for sqlchat.
//!
//! `ChatContext` owns one session: the transcript and the Responder that
//! answers its questions. It is an explicit value passed to the UI, never
//! ambient state, and it can only be created once a non-empty credential
//! and a live database handle exist.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::{EventSink, GroqClient, GroqConfig, Responder, SqlAgent};
use crate::config::{Credential, DatabaseConfig};
use crate::db::HandleCache;
use crate::error::{ChatError, Result};
use crate::session::SessionStore;

/// Help text displayed for the /help command.
const HELP_TEXT: &str = r#"Available commands:
  /clear           - Reset the chat to the greeting
  /help            - Show this help message
  /quit, /exit     - Exit the application

Anything else is sent to the assistant as a question about the database."#;

/// Result of processing user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    /// No action needed (empty input).
    None,
    /// A question was answered; the transcript holds the new exchange.
    Answered,
    /// A status text to show outside the transcript.
    Notice(String),
    /// Application should exit.
    Exit,
}

/// One chat session: transcript plus the agent answering for it.
#[derive(Debug)]
pub struct ChatContext {
    store: SessionStore,
    responder: Arc<dyn Responder>,
    connection_info: String,
}

impl ChatContext {
    /// Builds a context against a real database and the Groq API.
    ///
    /// Refuses an empty credential before touching the database, so
    /// neither a handle nor an agent ever exists without one. Connection
    /// and validation failures surface once; nothing is retried. The
    /// agent keeps resolving its handle through the shared cache, so a
    /// cached entry that expires mid-session is reconnected on the next
    /// question.
    pub async fn create(
        handles: &Arc<Mutex<HandleCache>>,
        config: &DatabaseConfig,
        credential: &Credential,
        model: &str,
    ) -> Result<Self> {
        if credential.is_empty() {
            return Err(ChatError::config("A Groq API key is required"));
        }
        config.validate()?;

        // Connect now so configuration problems surface here, not on the
        // first question.
        handles.lock().await.get_or_connect(config).await?;

        let llm = Arc::new(GroqClient::new(GroqConfig::new(credential.expose(), model))?);
        let responder = Arc::new(SqlAgent::new(llm, config.clone(), Arc::clone(handles)));

        Ok(Self::with_responder(responder, config.display_string()))
    }

    /// Builds a context around an existing Responder.
    pub fn with_responder(responder: Arc<dyn Responder>, connection_info: String) -> Self {
        Self {
            store: SessionStore::new(),
            responder,
            connection_info,
        }
    }

    /// Returns the transcript.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Returns the display string of the active configuration.
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Returns a clone of the Responder handle for spawned work.
    pub fn responder(&self) -> Arc<dyn Responder> {
        Arc::clone(&self.responder)
    }

    /// Replaces the transcript with an existing one.
    ///
    /// Reconfiguring the connection rebuilds the context but must not
    /// discard the chat history; only `/clear` does that.
    pub fn resume_transcript(&mut self, store: SessionStore) {
        self.store = store;
    }

    /// Consumes the context, yielding its transcript.
    pub fn into_store(self) -> SessionStore {
        self.store
    }

    /// Handles one unit of user input.
    ///
    /// Exactly one input per invocation; the caller serializes calls. A
    /// Responder failure comes back as an error and leaves the transcript
    /// with only the already appended user message.
    pub async fn handle_input(&mut self, input: &str, events: &EventSink) -> Result<InputResult> {
        let input = input.trim();

        if input.is_empty() {
            return Ok(InputResult::None);
        }

        if input.starts_with('/') {
            return Ok(self.handle_command(input));
        }

        self.handle_question(input, events).await?;
        Ok(InputResult::Answered)
    }

    /// Dispatches a slash command. The input must start with '/'.
    pub fn handle_command(&mut self, input: &str) -> InputResult {
        let command = input
            .split_whitespace()
            .next()
            .unwrap_or(input)
            .to_lowercase();

        match command.as_str() {
            "/clear" => {
                self.store.reset();
                InputResult::Notice("Chat history cleared.".to_string())
            }
            "/help" => InputResult::Notice(HELP_TEXT.to_string()),
            "/quit" | "/exit" => InputResult::Exit,
            _ => InputResult::Notice(format!(
                "Unknown command: {command}. Type /help for available commands."
            )),
        }
    }

    /// Records the question in the transcript before the Responder runs.
    ///
    /// Split out so the UI can show the question while the answer is
    /// still in flight. Pairs with [`complete_question`].
    ///
    /// [`complete_question`]: ChatContext::complete_question
    pub fn begin_question(&mut self, question: &str) {
        self.store.append_user(question);
    }

    /// Records a successful answer for the most recent question. On
    /// failure nothing is recorded; the question stays in the transcript.
    pub fn complete_question(&mut self, answer: String) {
        self.store.append_assistant(answer);
    }

    /// Appends the question, asks the Responder, appends the answer.
    ///
    /// On failure nothing is appended beyond the user message; the error
    /// is the caller's to display.
    async fn handle_question(&mut self, question: &str, events: &EventSink) -> Result<()> {
        self.begin_question(question);

        let answer = self.responder.answer(question, events).await?;
        self.complete_question(answer);

        Ok(())
    }
}
