//! Query execution tests against real read-only SQLite files.

use tempfile::TempDir;

use sqlchat::db::{DatabaseHandle, SqliteHandle, Value};
use sqlchat::error::ChatError;

use super::common::seed_student_db;

async fn connect(dir: &TempDir) -> SqliteHandle {
    let path = seed_student_db(dir).await;
    SqliteHandle::connect(&path).await.unwrap()
}

#[tokio::test]
async fn test_aggregate_query() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    let result = handle
        .execute_query("SELECT class, COUNT(*) AS n, AVG(marks) AS avg_marks \
                        FROM student GROUP BY class ORDER BY class")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 3);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0][0], Value::String("DEVOPS".to_string()));
    assert_eq!(result.rows[0][1], Value::Int(2));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_result_formats_cleanly() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    let result = handle
        .execute_query("SELECT name FROM student WHERE marks > 1000")
        .await
        .unwrap();

    assert_eq!(result.row_count, 0);
    assert!(result.is_empty());
    assert_eq!(result.format_compact(), "(no rows)");

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_compact_formatting_aligns_columns() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    let result = handle
        .execute_query("SELECT name, marks FROM student WHERE marks > 80 ORDER BY marks")
        .await
        .unwrap();
    let formatted = result.format_compact();

    assert!(formatted.contains("name"));
    assert!(formatted.contains("Sudhanshu | 100"));
    assert!(formatted.trim_end().ends_with("(3 rows)"));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_oversized_result_is_truncated() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    // Generate 1500 rows without touching the (read-only) tables.
    let result = handle
        .execute_query(
            "WITH RECURSIVE cnt(x) AS \
             (SELECT 1 UNION ALL SELECT x + 1 FROM cnt WHERE x < 1500) \
             SELECT x FROM cnt",
        )
        .await
        .unwrap();

    assert!(result.was_truncated);
    assert_eq!(result.row_count, 1000);
    assert!(result.format_compact().contains("1000+"));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_write_statements_are_rejected() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    for sql in [
        "INSERT INTO student VALUES ('Eve', 'X', 'A', 1)",
        "UPDATE student SET marks = 0",
        "DELETE FROM student",
        "DROP TABLE student",
    ] {
        let err = handle.execute_query(sql).await.unwrap_err();
        assert!(matches!(err, ChatError::Agent(_)), "{sql} should fail");
    }

    // The data is untouched.
    let result = handle
        .execute_query("SELECT COUNT(*) FROM student")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0], Value::Int(5));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_null_values_survive_conversion() {
    let dir = TempDir::new().unwrap();
    let handle = connect(&dir).await;

    let result = handle
        .execute_query("SELECT name, NULL AS missing FROM student LIMIT 1")
        .await
        .unwrap();

    assert_eq!(result.rows[0][1], Value::Null);

    handle.close().await.unwrap();
}
