//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// DuckDB database backend
///
/// The connection lives behind a `Mutex<Option<_>>` so that [`close`]
/// can release it while the backend is still shared.
///
/// [`close`]: DuckDbBackend::close
pub struct DuckDbBackend {
    conn: Mutex<Option<Connection>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::from_open_error(e, &path.display().to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Open a second connection to the same database instance
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self.with_conn(|conn| {
            conn.try_clone()
                .map_err(|e| DbError::ConnectionError(e.to_string()))
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Run `body` against the open connection
    pub(crate) fn with_conn<T>(
        &self,
        body: impl FnOnce(&Connection) -> DbResult<T>,
    ) -> DbResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        match guard.as_ref() {
            Some(conn) => body(conn),
            None => Err(DbError::Closed),
        }
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&self) -> DbResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        match guard.take() {
            Some(conn) => conn.close().map_err(|(conn, e)| {
                // Keep the handle so a later close can retry.
                *guard = Some(conn);
                DbError::ConnectionError(e.to_string())
            }),
            None => Ok(()),
        }
    }

    /// Execute SQL synchronously
    pub(crate) fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        self.with_conn(|conn| Ok(conn.execute(sql, [])?))
    }

    /// Execute batch SQL synchronously
    pub(crate) fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    /// Execute batch SQL inside a transaction
    fn execute_in_transaction_sync(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| transaction(conn, |conn| Ok(conn.execute_batch(sql)?)))
    }

    /// Query count synchronously
    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                    row.get(0)
                })?;
            Ok(count as usize)
        })
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        // Handle schema-qualified names
        let (schema, table) = if let Some(pos) = name.rfind('.') {
            (&name[..pos], &name[pos + 1..])
        } else {
            ("main", name)
        };

        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
pub(crate) fn transaction<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> DbResult<T>,
) -> DbResult<T> {
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

    let result = body(conn);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(DbError::from(commit_err));
            }
        }
        Err(_) => {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
    result
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn execute_in_transaction(&self, sql: &str) -> DbResult<()> {
        self.execute_in_transaction_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
