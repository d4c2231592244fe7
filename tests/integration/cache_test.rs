//! Handle cache tests against real SQLite files.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sqlchat::config::DatabaseConfig;
use sqlchat::db::HandleCache;
use sqlchat::error::ChatError;

use super::common::seed_student_db;

#[tokio::test]
async fn test_same_config_reuses_handle() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let config = DatabaseConfig::Local { path };

    let mut cache = HandleCache::new();
    let (first, schema) = cache.get_or_connect(&config).await.unwrap();
    assert_eq!(schema.tables[0].name, "student");

    let (second, _) = cache.get_or_connect(&config).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_changed_config_reconnects() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let other_dir = TempDir::new().unwrap();
    let other_path = seed_student_db(&other_dir).await;

    let mut cache = HandleCache::new();
    let (first, _) = cache
        .get_or_connect(&DatabaseConfig::Local { path })
        .await
        .unwrap();
    let (second, _) = cache
        .get_or_connect(&DatabaseConfig::Local { path: other_path })
        .await
        .unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_expired_entry_reconnects() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let config = DatabaseConfig::Local { path };

    let mut cache = HandleCache::with_ttl(Duration::ZERO);
    let (first, _) = cache.get_or_connect(&config).await.unwrap();
    let (second, _) = cache.get_or_connect(&config).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_missing_file_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.db");
    let config = DatabaseConfig::Local { path: path.clone() };

    let mut cache = HandleCache::new();
    let err = cache.get_or_connect(&config).await.unwrap_err();

    assert!(matches!(err, ChatError::Connection(_)));
    assert!(err.to_string().contains("not found"));
    // Read-only means read-only: the failed attempt must not create the file.
    assert!(!path.exists());
    assert!(cache.cached(&config).is_none());
}

#[tokio::test]
async fn test_schema_comes_back_with_cached_handle() {
    let dir = TempDir::new().unwrap();
    let path = seed_student_db(&dir).await;
    let config = DatabaseConfig::Local { path };

    let mut cache = HandleCache::new();
    cache.get_or_connect(&config).await.unwrap();

    let (_, schema) = cache.cached(&config).unwrap();
    let names: Vec<&str> = schema.tables[0]
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["name", "class", "section", "marks"]);
}
