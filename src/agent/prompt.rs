//! Prompt construction for model requests.
//!
//! Builds the system prompt with database schema context.

use std::sync::Arc;

use crate::agent::Message;
use crate::db::{DatabaseBackend, Schema};

/// System prompt template for the SQL assistant.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a helpful assistant that answers questions about a {dialect} database.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- When a question needs data from the database, write one valid {dialect} query
- Use appropriate JOINs based on foreign keys
- The database is read-only; only SELECT queries will run
- If the question cannot be answered with the schema, say so in plain language

OUTPUT FORMAT:
Wrap the query in a ```sql code block. You may add a short explanation before or after it.
If no query is needed, answer in plain text without a code block."#;

/// Builds the system prompt with the schema and dialect injected.
pub fn build_system_prompt(backend: DatabaseBackend, schema: &Schema) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{dialect}", backend.dialect())
        .replace("{schema}", &schema.format_for_llm())
}

/// Builds the message list for one question.
///
/// Only the current question goes to the model; the transcript is
/// presentation state and is never sent.
pub fn build_messages(system_prompt: &str, question: &str) -> Vec<Message> {
    vec![Message::system(system_prompt), Message::user(question)]
}

/// Cache for formatted schema prompts.
///
/// Avoids rebuilding the system prompt on every request when the schema
/// hasn't changed.
#[derive(Debug, Default)]
pub struct PromptCache {
    schema_hash: u64,
    system_prompt: Option<Arc<str>>,
}

impl PromptCache {
    /// Creates a new empty prompt cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cached system prompt, rebuilding if the schema has changed.
    pub fn get_or_build(&mut self, backend: DatabaseBackend, schema: &Schema) -> Arc<str> {
        let hash = schema.content_hash();
        match &self.system_prompt {
            Some(prompt) if self.schema_hash == hash => Arc::clone(prompt),
            _ => {
                let prompt: Arc<str> = Arc::from(build_system_prompt(backend, schema));
                self.schema_hash = hash;
                self.system_prompt = Some(Arc::clone(&prompt));
                prompt
            }
        }
    }
}
