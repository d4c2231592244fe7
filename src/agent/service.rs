//! The concrete Responder implementation.
//!
//! `SqlAgent` wires the model and the database together for one question:
//! stream the model's reply, pull out the SQL it wrote, run that query,
//! and fold the result into the final answer. The model does the
//! reasoning; this type only moves data across the boundary.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::agent::{
    build_messages, emit, extract_sql, AgentEvent, EventSink, LlmClient, PromptCache, Responder,
};
use crate::config::DatabaseConfig;
use crate::db::{DatabaseHandle, HandleCache, Schema};
use crate::error::{ChatError, Result};

/// Answers questions by asking the model for SQL and executing it.
///
/// The database handle is resolved through the shared cache on every
/// question, so an expired or replaced entry is reconnected without the
/// session noticing. The system prompt follows the schema that resolution
/// returns.
#[derive(Debug)]
pub struct SqlAgent {
    llm: Arc<dyn LlmClient>,
    config: DatabaseConfig,
    handles: Arc<Mutex<HandleCache>>,
    prompts: Mutex<PromptCache>,
}

impl SqlAgent {
    /// Creates an agent bound to one model client and one database
    /// configuration, resolving handles through the given cache.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        config: DatabaseConfig,
        handles: Arc<Mutex<HandleCache>>,
    ) -> Self {
        Self {
            llm,
            config,
            handles,
            prompts: Mutex::new(PromptCache::new()),
        }
    }

    /// Resolves a live handle and its schema for this question.
    async fn resolve_handle(&self) -> Result<(Arc<dyn DatabaseHandle>, Schema)> {
        self.handles.lock().await.get_or_connect(&self.config).await
    }

    /// Streams the model's reply, forwarding fragments to the sink.
    async fn stream_reply(
        &self,
        system_prompt: &str,
        question: &str,
        events: &EventSink,
    ) -> Result<String> {
        let messages = build_messages(system_prompt, question);
        let mut stream = self.llm.complete_stream(&messages).await?;

        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            emit(events, AgentEvent::Thinking(chunk.clone()));
            reply.push_str(&chunk);
        }

        if reply.trim().is_empty() {
            return Err(ChatError::agent("The model returned an empty reply"));
        }

        Ok(reply)
    }
}

#[async_trait]
impl Responder for SqlAgent {
    async fn answer(&self, question: &str, events: &EventSink) -> Result<String> {
        let (handle, schema) = self.resolve_handle().await?;
        let system_prompt = self
            .prompts
            .lock()
            .await
            .get_or_build(handle.backend(), &schema);

        let reply = self.stream_reply(&system_prompt, question, events).await?;

        // A reply without a code block is a plain-text answer, for example
        // when the question has nothing to do with the schema.
        let Some(sql) = extract_sql(&reply) else {
            return Ok(reply.trim().to_string());
        };

        debug!("Executing generated query: {sql}");
        emit(events, AgentEvent::Sql(sql.clone()));
        emit(events, AgentEvent::Executing);

        let result = handle.execute_query(&sql).await?;
        emit(events, AgentEvent::Rows(result.row_count));

        Ok(format!(
            "{}\n\n{}",
            reply.trim(),
            result.format_compact().trim_end()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{MockLlmClient, Role};
    use crate::db::{FailingDatabaseHandle, MockDatabaseHandle};
    use tokio::sync::mpsc;

    fn sink() -> (EventSink, mpsc::UnboundedReceiver<AgentEvent>) {
        mpsc::unbounded_channel()
    }

    fn test_config() -> DatabaseConfig {
        DatabaseConfig::Local {
            path: "student.db".into(),
        }
    }

    /// Builds an agent whose cache already holds the given handle.
    async fn agent_with(
        llm: MockLlmClient,
        handle: Arc<dyn DatabaseHandle>,
    ) -> (SqlAgent, Arc<MockLlmClient>, Arc<Mutex<HandleCache>>) {
        let schema = match handle.introspect_schema().await {
            Ok(schema) => schema,
            Err(_) => Schema {
                tables: vec![],
                foreign_keys: vec![],
            },
        };

        let mut cache = HandleCache::new();
        cache.insert(test_config(), handle, schema).await;
        let handles = Arc::new(Mutex::new(cache));

        let llm = Arc::new(llm);
        let agent = SqlAgent::new(
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            test_config(),
            Arc::clone(&handles),
        );
        (agent, llm, handles)
    }

    #[tokio::test]
    async fn test_answer_executes_extracted_sql() {
        let db = Arc::new(MockDatabaseHandle::new());
        let (agent, _, _) = agent_with(
            MockLlmClient::with_response(
                "Here you go:\n\n```sql\nSELECT name, marks FROM student WHERE marks > 80;\n```",
            ),
            Arc::clone(&db) as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, mut rx) = sink();
        let answer = agent
            .answer("How many students scored above 80?", &tx)
            .await
            .unwrap();

        assert_eq!(
            db.executed_queries(),
            vec!["SELECT name, marks FROM student WHERE marks > 80;"]
        );
        assert!(answer.contains("Here you go:"));
        assert!(answer.contains("Krish"));

        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::Thinking(_))));
        assert!(events.contains(&AgentEvent::Sql(
            "SELECT name, marks FROM student WHERE marks > 80;".to_string()
        )));
        assert!(events.contains(&AgentEvent::Executing));
        assert!(events.contains(&AgentEvent::Rows(2)));
    }

    #[tokio::test]
    async fn test_plain_text_reply_skips_database() {
        let db = Arc::new(MockDatabaseHandle::new());
        let (agent, _, _) = agent_with(
            MockLlmClient::with_response("I can only answer questions about the database."),
            Arc::clone(&db) as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        let answer = agent.answer("What is the weather?", &tx).await.unwrap();

        assert_eq!(answer, "I can only answer questions about the database.");
        assert!(db.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_is_agent_error() {
        let db = Arc::new(MockDatabaseHandle::new());
        let (agent, _, _) = agent_with(
            MockLlmClient::failing("Rate limited"),
            Arc::clone(&db) as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        let err = agent.answer("anything", &tx).await.unwrap_err();
        assert!(matches!(err, ChatError::Agent(_)));
        assert!(db.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_agent_error() {
        let db = Arc::new(FailingDatabaseHandle::new("SQL error: no such table"));
        let (agent, _, _) = agent_with(
            MockLlmClient::with_response("```sql\nSELECT * FROM missing;\n```"),
            db as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        let err = agent.answer("anything", &tx).await.unwrap_err();
        assert!(matches!(err, ChatError::Agent(_)));
        assert!(err.to_string().contains("no such table"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_agent_error() {
        let db = Arc::new(MockDatabaseHandle::new());
        let (agent, _, _) = agent_with(
            MockLlmClient::with_response("   "),
            db as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        let err = agent.answer("anything", &tx).await.unwrap_err();
        assert!(err.to_string().contains("empty reply"));
    }

    #[tokio::test]
    async fn test_question_reaches_model_verbatim() {
        let db = Arc::new(MockDatabaseHandle::new());
        let (agent, llm, _) = agent_with(
            MockLlmClient::with_response("ok"),
            db as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        agent.answer("How many students are there?", &tx).await.unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].last().unwrap().role, Role::User);
        assert_eq!(
            requests[0].last().unwrap().content,
            "How many students are there?"
        );
    }

    #[tokio::test]
    async fn test_replaced_handle_is_picked_up_between_questions() {
        let first = Arc::new(MockDatabaseHandle::new());
        let (agent, _, handles) = agent_with(
            MockLlmClient::with_response("```sql\nSELECT 1;\n```"),
            Arc::clone(&first) as Arc<dyn DatabaseHandle>,
        )
        .await;

        let (tx, _rx) = sink();
        agent.answer("first", &tx).await.unwrap();
        assert_eq!(first.executed_queries().len(), 1);

        // Swap the cached entry, as the cache does on expiry.
        let second = Arc::new(MockDatabaseHandle::new());
        let schema = second.introspect_schema().await.unwrap();
        handles
            .lock()
            .await
            .insert(
                test_config(),
                Arc::clone(&second) as Arc<dyn DatabaseHandle>,
                schema,
            )
            .await;
        assert!(first.is_closed());

        agent.answer("second", &tx).await.unwrap();
        assert_eq!(first.executed_queries().len(), 1);
        assert_eq!(second.executed_queries().len(), 1);
    }
}
