//! Mock database handles for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{
    Column, ColumnInfo, DatabaseBackend, DatabaseHandle, QueryResult, Schema, Table, Value,
};
use crate::error::{ChatError, Result};

/// In-memory database handle returning canned data.
///
/// Records every executed query so tests can assert on the SQL that
/// reached the database.
#[derive(Debug)]
pub struct MockDatabaseHandle {
    schema: Schema,
    result: QueryResult,
    executed: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl MockDatabaseHandle {
    /// Creates a mock with the demo student schema and a small result set.
    pub fn new() -> Self {
        let schema = Schema {
            tables: vec![Table {
                name: "student".to_string(),
                columns: vec![
                    Column::new("name", "VARCHAR(25)"),
                    Column::new("class", "VARCHAR(25)"),
                    Column::new("section", "VARCHAR(25)"),
                    Column::new("marks", "INT"),
                ],
                primary_key: vec![],
            }],
            foreign_keys: vec![],
        };

        let result = QueryResult::with_data(
            vec![
                ColumnInfo::new("name", "VARCHAR(25)"),
                ColumnInfo::new("marks", "INT"),
            ],
            vec![
                vec![Value::String("Krish".to_string()), Value::Int(90)],
                vec![Value::String("Sudhanshu".to_string()), Value::Int(100)],
            ],
        );

        Self {
            schema,
            result,
            executed: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Replaces the canned query result.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// Returns the queries executed so far.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Returns true if close() was called.
    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

impl Default for MockDatabaseHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseHandle for MockDatabaseHandle {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        Ok(self.result.clone())
    }

    async fn close(&self) -> Result<()> {
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
        Ok(())
    }
}

/// Database handle that fails every operation.
#[derive(Debug)]
pub struct FailingDatabaseHandle {
    message: String,
}

impl FailingDatabaseHandle {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseHandle for FailingDatabaseHandle {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Err(ChatError::connection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(ChatError::agent(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
