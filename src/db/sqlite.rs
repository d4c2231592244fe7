//! SQLite database handle implementation.
//!
//! Local databases are always opened read-only and are never created. The
//! chat agent only ever reads; opening read-only makes that a property of
//! the connection rather than a convention.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::{debug, warn};

use crate::db::{
    Column, ColumnInfo, DatabaseBackend, DatabaseHandle, ForeignKey, QueryResult, Row, Schema,
    Table, Value,
};
use crate::error::{ChatError, Result};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 1000;

/// Read-only SQLite database handle.
#[derive(Debug)]
pub struct SqliteHandle {
    pool: SqlitePool,
}

impl SqliteHandle {
    /// Opens an existing database file read-only.
    ///
    /// Fails immediately if the file does not exist; nothing is created
    /// and there is no retry.
    pub async fn connect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChatError::connection(format!(
                "Database file '{}' not found",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                ChatError::connection(format!(
                    "Cannot open database file '{}': {e}",
                    path.display()
                ))
            })?;

        debug!("Opened sqlite database {} read-only", path.display());
        Ok(Self { pool })
    }

    /// Creates a handle from an existing pool.
    ///
    /// This is primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::connection(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        // One table_info pass yields both the columns and the pk flags.
        for table_name in table_names {
            let info = self.table_info(&table_name).await?;

            let mut columns = Vec::with_capacity(info.len());
            let mut primary_key = Vec::new();
            for (_, name, data_type, notnull, default, pk) in info {
                if pk > 0 {
                    primary_key.push(name.clone());
                }
                columns.push(Column {
                    name,
                    data_type,
                    is_nullable: notnull == 0,
                    default,
                });
            }

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
            });
        }

        Ok(tables)
    }

    /// Runs `PRAGMA table_info` for a table.
    ///
    /// PRAGMA arguments cannot be bound, so the identifier is quoted and
    /// embedded directly. Rows are (cid, name, type, notnull, dflt_value, pk).
    async fn table_info(
        &self,
        table_name: &str,
    ) -> Result<Vec<(i64, String, String, i64, Option<String>, i64)>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table_name));
        sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ChatError::connection(format!("Failed to fetch columns for {table_name}: {e}"))
            })
    }

    async fn fetch_foreign_keys(&self, tables: &[Table]) -> Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();

        for table in tables {
            let sql = format!("PRAGMA foreign_key_list({})", quote_ident(&table.name));
            // Rows are (id, seq, table, from, to, on_update, on_delete, match).
            let rows: Vec<(i64, i64, String, String, Option<String>, String, String, String)> =
                sqlx::query_as(&sql).fetch_all(&self.pool).await.map_err(|e| {
                    ChatError::connection(format!(
                        "Failed to fetch foreign keys for {}: {e}",
                        table.name
                    ))
                })?;

            // Group multi-column keys by their id.
            let mut current: Option<(i64, ForeignKey)> = None;
            for (id, _, to_table, from_column, to_column, ..) in rows {
                let to_column = to_column.unwrap_or_default();
                match &mut current {
                    Some((fk_id, fk)) if *fk_id == id => {
                        fk.from_columns.push(from_column);
                        fk.to_columns.push(to_column);
                    }
                    _ => {
                        if let Some((_, fk)) = current.take() {
                            foreign_keys.push(fk);
                        }
                        current = Some((
                            id,
                            ForeignKey::new(
                                table.name.clone(),
                                vec![from_column],
                                to_table,
                                vec![to_column],
                            ),
                        ));
                    }
                }
            }
            if let Some((_, fk)) = current.take() {
                foreign_keys.push(fk);
            }
        }

        Ok(foreign_keys)
    }
}

#[async_trait]
impl DatabaseHandle for SqliteHandle {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys(&tables).await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            ChatError::agent(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| ChatError::agent(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Quotes an identifier for embedding in a PRAGMA statement.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a SqliteRow to our Value type.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INTEGER" | "INT" | "BIGINT" | "INT4" | "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // TEXT and everything else, including NULL-typed expression columns.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Formats a query error, preferring the database's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("SQL error: {}", db_error.message()),
        None => error.to_string(),
    }
}
