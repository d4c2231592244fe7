//! Database abstraction layer for sqlchat.
//!
//! Provides a trait-based interface over the two supported backends so the
//! rest of the application never cares which engine is answering.

pub mod cache;
mod mock;
mod mysql;
mod schema;
mod sqlite;
mod types;

pub use cache::HandleCache;
pub use mock::{FailingDatabaseHandle, MockDatabaseHandle};
pub use mysql::MySqlHandle;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::SqliteHandle;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Mysql,
}

impl DatabaseBackend {
    /// Returns the backend as a display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Mysql => "mysql",
        }
    }

    /// Returns the SQL dialect name used in the model prompt.
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Mysql => "MySQL",
        }
    }
}

/// Creates a database handle for the given configuration.
///
/// This is the central factory for database connections. Local files are
/// opened read-only; remote connections use the credentials exactly as
/// provided, with no retry on failure.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseHandle>> {
    config.validate()?;
    match config {
        DatabaseConfig::Local { path } => {
            let handle = SqliteHandle::connect(path).await?;
            Ok(Arc::new(handle))
        }
        DatabaseConfig::Remote(remote) => {
            let handle = MySqlHandle::connect(remote).await?;
            Ok(Arc::new(handle))
        }
    }
}

/// Trait defining the interface for database handles.
///
/// All operations are async and return Results with ChatError.
#[async_trait]
pub trait DatabaseHandle: Send + Sync + std::fmt::Debug {
    /// Returns which backend this handle talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
