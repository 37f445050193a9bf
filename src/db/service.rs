use crate::db::pool::DuckDBConnectionManager;
use crate::db::schema::{ColumnSchema, SchemaDescription, TableSchema};
use crate::error::ApiError;
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Row as DuckRow;
use r2d2::Pool;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;

/// One result row, column name to JSON value.
pub type Row = Map<String, Value>;

/// Owns the DuckDB connection pool and exposes the read path the endpoints
/// need: run SQL, describe the catalog, and ping for health checks.
#[derive(Clone)]
pub struct DatabaseService {
    pool: Pool<DuckDBConnectionManager>,
}

impl DatabaseService {
    /// Connections are opened lazily; a bad database path surfaces on the
    /// first use (and on `ping`), not here. Callers that want fail-fast
    /// behavior ping right after construction.
    pub fn new(db_path: &str, pool_size: usize) -> Self {
        let manager = DuckDBConnectionManager::new(db_path);
        let pool = Pool::builder()
            .max_size(pool_size as u32)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_secs(5))
            .build_unchecked(manager);
        Self { pool }
    }

    /// Executes `sql` and returns at most `max_rows` rows plus elapsed
    /// milliseconds. A bare SELECT without an explicit LIMIT gets one
    /// appended so DuckDB never materializes more than the cap.
    pub async fn execute(&self, sql: &str, max_rows: usize) -> Result<(Vec<Row>, f64), ApiError> {
        let pool = self.pool.clone();
        let sql = sql.to_string();

        let task = tokio::task::spawn_blocking(move || -> Result<(Vec<Row>, f64), ApiError> {
            let conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("connection pool: {}", e)))?;

            let effective_sql = apply_row_limit(&sql, max_rows);
            debug!(sql = %effective_sql, "executing query");

            let started = Instant::now();
            let mut stmt = conn
                .prepare(&effective_sql)
                .map_err(|e| ApiError::QueryExecution(e.to_string()))?;
            let mut rows = stmt
                .query([])
                .map_err(|e| ApiError::QueryExecution(e.to_string()))?;

            let mut results: Vec<Row> = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| ApiError::QueryExecution(e.to_string()))?
            {
                if results.len() >= max_rows {
                    break;
                }
                let stmt: &duckdb::Statement<'_> = row.as_ref();
                let column_count = stmt.column_count();
                let mut record = Map::with_capacity(column_count);
                for idx in 0..column_count {
                    let name = stmt
                        .column_name(idx)
                        .map(|n| n.to_string())
                        .unwrap_or_else(|_| format!("column_{}", idx));
                    record.insert(name, column_to_json(row, idx));
                }
                results.push(record);
            }

            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            Ok((results, elapsed_ms))
        });

        task.await
            .map_err(|e| ApiError::Internal(format!("query task failed: {}", e)))?
    }

    /// Reads table and column metadata from the catalog. Used for LLM
    /// prompt context only, never persisted.
    pub async fn describe_schema(&self) -> Result<SchemaDescription, ApiError> {
        let pool = self.pool.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<SchemaDescription, ApiError> {
            let conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("connection pool: {}", e)))?;

            let mut tables_stmt = conn
                .prepare(
                    "SELECT table_name FROM information_schema.tables \
                     WHERE table_schema = 'main' AND table_type = 'BASE TABLE' \
                     ORDER BY table_name",
                )
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            let table_names: Vec<String> = tables_stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| ApiError::Internal(e.to_string()))?
                .filter_map(Result::ok)
                .collect();

            let mut tables = Vec::with_capacity(table_names.len());
            for table_name in &table_names {
                let mut columns_stmt = conn
                    .prepare(
                        "SELECT column_name, data_type FROM information_schema.columns \
                         WHERE table_schema = 'main' AND table_name = ? \
                         ORDER BY ordinal_position",
                    )
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                let columns: Vec<ColumnSchema> = columns_stmt
                    .query_map([table_name], |row| {
                        Ok(ColumnSchema {
                            name: row.get(0)?,
                            data_type: row.get(1)?,
                        })
                    })
                    .map_err(|e| ApiError::Internal(e.to_string()))?
                    .filter_map(Result::ok)
                    .collect();

                tables.push(TableSchema {
                    name: table_name.clone(),
                    columns,
                });
            }

            Ok(SchemaDescription { tables })
        });

        task.await
            .map_err(|e| ApiError::Internal(format!("schema task failed: {}", e)))?
    }

    /// Number of base tables in the catalog.
    pub async fn table_count(&self) -> Result<usize, ApiError> {
        let pool = self.pool.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<usize, ApiError> {
            let conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("connection pool: {}", e)))?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = 'main' AND table_type = 'BASE TABLE'",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(count as usize)
        });

        task.await
            .map_err(|e| ApiError::Internal(format!("table count task failed: {}", e)))?
    }

    /// Health-check probe: fetch a connection and run a trivial statement.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let pool = self.pool.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
            let conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("connection pool: {}", e)))?;
            conn.execute("SELECT 1", [])
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(())
        });

        task.await
            .map_err(|e| ApiError::Internal(format!("ping task failed: {}", e)))?
    }
}

fn apply_row_limit(sql: &str, max_rows: usize) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("SELECT") && !upper.contains("LIMIT") {
        format!("{} LIMIT {}", trimmed, max_rows)
    } else {
        trimmed.to_string()
    }
}

fn column_to_json(row: &DuckRow<'_>, idx: usize) -> Value {
    let value_ref = match row.get_ref(idx) {
        Ok(value_ref) => value_ref,
        Err(_) => return Value::Null,
    };

    match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(v) => Value::Bool(v),
        ValueRef::TinyInt(v) => Value::from(v),
        ValueRef::SmallInt(v) => Value::from(v),
        ValueRef::Int(v) => Value::from(v),
        ValueRef::BigInt(v) => Value::from(v),
        ValueRef::HugeInt(v) => Value::String(v.to_string()),
        ValueRef::UTinyInt(v) => Value::from(v),
        ValueRef::USmallInt(v) => Value::from(v),
        ValueRef::UInt(v) => Value::from(v),
        ValueRef::UBigInt(v) => Value::from(v),
        ValueRef::Float(v) => Value::from(v),
        ValueRef::Double(v) => Value::from(v),
        ValueRef::Text(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Timestamp(unit, v) => timestamp_to_json(unit, v),
        ValueRef::Date32(days) => date32_to_json(days),
        _ => match row.get::<_, String>(idx) {
            Ok(text) => Value::String(text),
            Err(_) => Value::Null,
        },
    }
}

fn date32_to_json(days: i32) -> Value {
    days.checked_add(719_163)
        .and_then(chrono::NaiveDate::from_num_days_from_ce_opt)
        .map(|d| Value::String(d.to_string()))
        .unwrap_or(Value::Null)
}

fn timestamp_to_json(unit: TimeUnit, value: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    };
    chrono::DateTime::from_timestamp_micros(micros)
        .map(|dt| Value::String(dt.naive_utc().to_string()))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_service(dir: &TempDir) -> DatabaseService {
        let db_path = dir.path().join("test.db");
        let conn = duckdb::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER, name VARCHAR, email VARCHAR);
             INSERT INTO users VALUES
               (1, 'Alice', 'alice@example.com'),
               (2, 'Bob', 'bob@example.com'),
               (3, 'Carol', 'carol@example.com');",
        )
        .unwrap();
        drop(conn);
        DatabaseService::new(db_path.to_str().unwrap(), 2)
    }

    #[tokio::test]
    async fn executes_select_and_reports_rows() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);

        let (rows, elapsed_ms) = service
            .execute("SELECT id, name FROM users ORDER BY id", 100)
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], serde_json::json!(1));
        assert_eq!(rows[0]["name"], serde_json::json!("Alice"));
        assert!(elapsed_ms >= 0.0);
    }

    #[tokio::test]
    async fn truncates_at_max_rows() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);

        let (rows, _) = service
            .execute("SELECT * FROM users ORDER BY id", 2)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn execution_error_carries_database_message() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);

        let err = service
            .execute("SELECT * FROM missing_table", 100)
            .await
            .unwrap_err();
        match err {
            ApiError::QueryExecution(msg) => assert!(msg.contains("missing_table")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn describes_schema() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);

        let schema = service.describe_schema().await.unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].name, "users");
        let column_names: Vec<_> = schema.tables[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(column_names, vec!["id", "name", "email"]);
    }

    #[tokio::test]
    async fn counts_base_tables() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);
        assert_eq!(service.table_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ping_succeeds_on_open_database() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(&dir);
        service.ping().await.unwrap();
    }

    #[tokio::test]
    async fn ping_fails_on_invalid_path() {
        let service = DatabaseService::new("/nonexistent/dir/test.db", 1);
        assert!(service.ping().await.is_err());
    }

    #[test]
    fn date_conversion_handles_extremes() {
        assert_eq!(date32_to_json(0), serde_json::json!("1970-01-01"));
        assert_eq!(date32_to_json(19_797), serde_json::json!("2024-03-15"));
        // Days past chrono's range, or past i32 arithmetic, degrade to null
        assert_eq!(date32_to_json(i32::MAX), Value::Null);
        assert_eq!(date32_to_json(i32::MIN), Value::Null);
    }

    #[test]
    fn row_limit_injection() {
        assert_eq!(
            apply_row_limit("SELECT * FROM users", 50),
            "SELECT * FROM users LIMIT 50"
        );
        assert_eq!(
            apply_row_limit("SELECT * FROM users;", 50),
            "SELECT * FROM users LIMIT 50"
        );
        // Existing LIMIT is left alone
        assert_eq!(
            apply_row_limit("SELECT * FROM users LIMIT 5", 50),
            "SELECT * FROM users LIMIT 5"
        );
        assert_eq!(
            apply_row_limit("WITH t AS (SELECT 1) SELECT * FROM t LIMIT 2", 50),
            "WITH t AS (SELECT 1) SELECT * FROM t LIMIT 2"
        );
    }
}
