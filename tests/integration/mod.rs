//! Integration tests for sqlchat.

pub mod cache_test;
pub mod chat_test;
pub mod config_test;
pub mod query_test;

pub mod common {
    use std::path::PathBuf;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
    use tempfile::TempDir;

    /// Creates a SQLite file with the sample student table.
    pub async fn seed_student_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("student.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();

        sqlx::query(
            "CREATE TABLE student (name VARCHAR(25), class VARCHAR(25), \
             section VARCHAR(25), marks INT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO student VALUES \
             ('Krish', 'Data Science', 'A', 90), \
             ('Sudhanshu', 'Data Science', 'B', 100), \
             ('Darius', 'Data Science', 'A', 86), \
             ('Vikash', 'DEVOPS', 'A', 50), \
             ('Dipesh', 'DEVOPS', 'A', 35)",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool.close().await;
        path
    }
}
