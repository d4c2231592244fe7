//! End-to-end chat flow tests.
//!
//! Drives a ChatContext whose agent runs against a real read-only SQLite
//! handle, with the model side mocked.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

use sqlchat::agent::{
    AgentEvent, EventSink, FailingResponder, LlmClient, MockLlmClient, Responder, SqlAgent,
};
use sqlchat::app::{ChatContext, InputResult};
use sqlchat::config::DatabaseConfig;
use sqlchat::db::HandleCache;
use sqlchat::error::ChatError;
use sqlchat::session::{ChatRole, GREETING};

use super::common::seed_student_db;

fn sink() -> (EventSink, mpsc::UnboundedReceiver<AgentEvent>) {
    mpsc::unbounded_channel()
}

/// Builds a context whose agent talks to the seeded database through a
/// canned model reply.
async fn context_with_reply(dir: &TempDir, reply: &str) -> ChatContext {
    let path = seed_student_db(dir).await;
    let config = DatabaseConfig::Local { path };
    let handles = Arc::new(Mutex::new(HandleCache::new()));

    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_response(reply));
    let responder: Arc<dyn Responder> = Arc::new(SqlAgent::new(llm, config, handles));

    ChatContext::with_responder(responder, "student.db (sqlite, read-only)".to_string())
}

#[tokio::test]
async fn test_session_starts_with_greeting() {
    let dir = TempDir::new().unwrap();
    let context = context_with_reply(&dir, "hi").await;

    let messages = context.store().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::Assistant);
    assert_eq!(messages[0].content, GREETING);
}

#[tokio::test]
async fn test_question_flows_through_model_and_database() {
    let dir = TempDir::new().unwrap();
    let mut context = context_with_reply(
        &dir,
        "Here are the top scorers:\n\n```sql\nSELECT name, marks FROM student \
         WHERE marks > 80 ORDER BY marks DESC;\n```",
    )
    .await;

    let (tx, mut rx) = sink();
    let result = context
        .handle_input("Who scored above 80?", &tx)
        .await
        .unwrap();
    assert_eq!(result, InputResult::Answered);

    let messages = context.store().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, ChatRole::User);
    let answer = &messages[2].content;
    assert!(answer.contains("Here are the top scorers:"));
    assert!(answer.contains("Sudhanshu"));
    assert!(answer.contains("Krish"));
    assert!(answer.contains("(3 rows)"));

    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(events.iter().any(|e| matches!(e, AgentEvent::Sql(_))));
    assert!(events.contains(&AgentEvent::Executing));
    assert!(events.contains(&AgentEvent::Rows(3)));
}

#[tokio::test]
async fn test_plain_answer_skips_database() {
    let dir = TempDir::new().unwrap();
    let mut context =
        context_with_reply(&dir, "I can only answer questions about the database.").await;

    let (tx, _rx) = sink();
    context.handle_input("What is the weather?", &tx).await.unwrap();

    let messages = context.store().messages();
    assert_eq!(
        messages[2].content,
        "I can only answer questions about the database."
    );
}

#[tokio::test]
async fn test_bad_query_surfaces_one_error() {
    let dir = TempDir::new().unwrap();
    let mut context =
        context_with_reply(&dir, "```sql\nSELECT * FROM no_such_table;\n```").await;

    let (tx, _rx) = sink();
    let err = context.handle_input("anything", &tx).await.unwrap_err();
    assert!(matches!(err, ChatError::Agent(_)));
    assert!(err.to_string().contains("no_such_table"));

    // Only the user message was added; the session stays usable.
    assert_eq!(context.store().len(), 2);
    let result = context.handle_input("/help", &tx).await.unwrap();
    assert!(matches!(result, InputResult::Notice(_)));
}

#[tokio::test]
async fn test_transcript_grows_by_two_per_answered_question() {
    let dir = TempDir::new().unwrap();
    let mut context = context_with_reply(&dir, "```sql\nSELECT COUNT(*) FROM student;\n```").await;

    let (tx, _rx) = sink();
    for i in 0..3 {
        context
            .handle_input(&format!("question {i}"), &tx)
            .await
            .unwrap();
    }
    assert_eq!(context.store().len(), 7);
}

#[tokio::test]
async fn test_clear_resets_transcript() {
    let dir = TempDir::new().unwrap();
    let mut context = context_with_reply(&dir, "ok").await;

    let (tx, _rx) = sink();
    context.handle_input("hello", &tx).await.unwrap();
    context.handle_input("/clear", &tx).await.unwrap();

    let messages = context.store().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, GREETING);
}

#[tokio::test]
async fn test_question_after_eviction_reconnects() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let config = DatabaseConfig::Local { path };
    let handles = Arc::new(Mutex::new(HandleCache::new()));

    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_response(
        "```sql\nSELECT COUNT(*) FROM student;\n```",
    ));
    let responder: Arc<dyn Responder> =
        Arc::new(SqlAgent::new(llm, config.clone(), Arc::clone(&handles)));
    let mut context = ChatContext::with_responder(responder, "test".to_string());

    let (tx, _rx) = sink();
    context.handle_input("first", &tx).await.unwrap();
    let (stale, _) = handles.lock().await.cached(&config).unwrap();

    // Close the cached handle, as the cache does when an entry expires.
    handles.lock().await.evict().await;

    context.handle_input("second", &tx).await.unwrap();
    assert_eq!(context.store().len(), 5);
    assert!(context.store().messages()[4].content.contains("5"));

    let (fresh, _) = handles.lock().await.cached(&config).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
}

#[tokio::test]
async fn test_expired_cache_entry_reconnects_transparently() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let config = DatabaseConfig::Local { path };
    let handles = Arc::new(Mutex::new(HandleCache::with_ttl(Duration::ZERO)));

    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_response(
        "```sql\nSELECT COUNT(*) FROM student;\n```",
    ));
    let responder: Arc<dyn Responder> =
        Arc::new(SqlAgent::new(llm, config.clone(), Arc::clone(&handles)));
    let mut context = ChatContext::with_responder(responder, "test".to_string());

    // Every entry is expired by the time the next question arrives; both
    // questions still get answers.
    let (tx, _rx) = sink();
    context.handle_input("first", &tx).await.unwrap();
    context.handle_input("second", &tx).await.unwrap();

    assert_eq!(context.store().len(), 5);
    assert!(handles.lock().await.cached(&config).is_none());
}

#[tokio::test]
async fn test_responder_failure_keeps_greeting_and_question() {
    let responder: Arc<dyn Responder> = Arc::new(FailingResponder::new("model offline"));
    let mut context = ChatContext::with_responder(responder, "test".to_string());

    let (tx, _rx) = sink();
    assert!(context.handle_input("q", &tx).await.is_err());

    let messages = context.store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, GREETING);
    assert_eq!(messages[1].content, "q");
}
