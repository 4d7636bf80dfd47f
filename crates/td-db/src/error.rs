//! Error types for td-db

use std::time::Duration;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Unique or primary key constraint rejected a write (D004)
    #[error("[D004] Constraint violated: {0}")]
    ConstraintViolation(String),

    /// Concurrent transaction touched the same rows (D005)
    #[error("[D005] Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Transaction management error (D006)
    #[error("[D006] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D007)
    #[error("[D007] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Connection already closed (D008)
    #[error("[D008] Database connection is closed")]
    Closed,

    /// Another process holds the database file lock (D009)
    #[error("[D009] Database file locked by another process: {0}")]
    FileLocked(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// True when the error means another writer got there first
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation(_)
                | DbError::TransactionConflict(_)
                | DbError::FileLocked(_)
        )
    }

    /// Classify a failure to open a database file
    pub fn from_open_error(err: duckdb::Error, path: &str) -> Self {
        classify_open_message(format!("{err}: {path}"))
    }
}

fn classify_open_message(msg: String) -> DbError {
    if msg.contains("Could not set lock on file") || msg.contains("Conflicting lock") {
        DbError::FileLocked(msg)
    } else {
        DbError::ConnectionError(msg)
    }
}

fn is_missing_relation(msg: &str) -> bool {
    let names_relation = msg.contains("Table with name")
        || msg.contains("View with name")
        || msg.contains("Table or view with name")
        || (msg.contains("Catalog Error") && msg.contains("Table"));
    names_relation && (msg.contains("does not exist") || msg.contains("not found"))
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        classify_message(err.to_string())
    }
}

// duckdb::Error does not expose structured variants for engine errors, so
// classification goes by the message prefix DuckDB uses.
fn classify_message(msg: String) -> DbError {
    if msg.contains("Constraint Error") {
        DbError::ConstraintViolation(msg)
    } else if msg.contains("TransactionContext Error") && msg.contains("onflict") {
        DbError::TransactionConflict(msg)
    } else if is_missing_relation(&msg) {
        DbError::TableNotFound(msg)
    } else {
        DbError::ExecutionError(msg)
    }
}

/// Schema store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connectivity, permission, or SQL failure in the store (S001)
    ///
    /// The cause is part of the message and not exposed as a source, so an
    /// error chain prints it once.
    #[error("[S001] Schema store unavailable: {0}")]
    Unavailable(DbError),

    /// Lock not obtained before the deadline (S002)
    #[error("[S002] Timed out after {waited:?} waiting for the migration lock: another process is migrating, or a previous run failed and left the lock held (see `td db status`)")]
    LockTimeout { waited: Duration },

    /// Lock acquisition cancelled by the caller (S003)
    #[error("[S003] Cancelled while waiting for the migration lock")]
    LockCancelled,

    /// Ledger contents violate the ordering invariant (S004)
    #[error("[S004] Migration ledger corrupt: {0}")]
    LedgerCorrupt(String),

    /// Snapshot sink or source failed (S005)
    #[error("[S005] Schema snapshot IO failed: {0}")]
    Io(std::io::Error),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Unavailable(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
