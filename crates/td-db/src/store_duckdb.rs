//! DuckDB schema store
//!
//! Bookkeeping lives in two tables in the `main` schema:
//!
//! - `schema_lock`: at most one row (`id = 1`); its presence means a
//!   migration run is in progress. The primary key makes the insert the
//!   acquisition primitive.
//! - `schema_migrations`: the applied-version ledger, read back in surrogate
//!   key order.
//!
//! Schema dumps leave both tables out, so a snapshot only describes the
//! application schema.

use crate::duckdb::{transaction, DuckDbBackend};
use crate::error::{DbError, StoreError, StoreResult};
use crate::store::{validate_ledger, wait_for, LockAttempt, LockOptions, SchemaStore};
use crate::traits::Database;
use async_trait::async_trait;
use std::io::{Read, Write};

const INIT_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_lock (id INTEGER PRIMARY KEY);
CREATE SEQUENCE IF NOT EXISTS schema_migrations_seq;
CREATE TABLE IF NOT EXISTS schema_migrations (
    id BIGINT PRIMARY KEY DEFAULT nextval('schema_migrations_seq'),
    version_id UBIGINT UNIQUE NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT current_timestamp
);";

const LOCK_ID: i32 = 1;

/// DDL for every application catalog object, in replayable order:
/// sequences, tables, views, then indexes, each in creation order.
/// The bookkeeping objects are excluded; `initialize` owns them.
const DUMP_SQL: &str = "
SELECT sql FROM (
    SELECT 0 AS kind, sequence_oid AS oid, sql FROM duckdb_sequences()
        WHERE database_name = current_database() AND NOT temporary
          AND sequence_name <> 'schema_migrations_seq'
    UNION ALL
    SELECT 1, table_oid, sql FROM duckdb_tables()
        WHERE database_name = current_database() AND NOT internal AND NOT temporary
          AND table_name NOT IN ('schema_lock', 'schema_migrations')
    UNION ALL
    SELECT 2, view_oid, sql FROM duckdb_views()
        WHERE database_name = current_database() AND NOT internal AND NOT temporary
    UNION ALL
    SELECT 3, index_oid, sql FROM duckdb_indexes()
        WHERE database_name = current_database()
          AND table_name NOT IN ('schema_lock', 'schema_migrations')
)
WHERE sql IS NOT NULL
ORDER BY kind, oid";

/// Schema store backed by a DuckDB database
pub struct DuckDbStore {
    backend: DuckDbBackend,
}

impl DuckDbStore {
    /// Wrap an open backend
    pub fn new(backend: DuckDbBackend) -> Self {
        Self { backend }
    }

    /// Open a store from a path string (handles :memory: special case)
    pub fn open(path: &str) -> StoreResult<Self> {
        Ok(Self::new(DuckDbBackend::new(path)?))
    }

    /// Open a store, waiting while another process holds the database file.
    ///
    /// DuckDB lets one process at a time open a file for writing, so a
    /// concurrent migrator is first seen here rather than at the lock row.
    /// The wait follows the same timeout, poll interval and cancel signal as
    /// [`acquire_lock`](SchemaStore::acquire_lock).
    pub async fn open_waiting(path: &str, options: &LockOptions) -> StoreResult<Self> {
        wait_for(options, move || async move {
            match DuckDbBackend::new(path) {
                Ok(backend) => Ok(Some(Self::new(backend))),
                Err(DbError::FileLocked(msg)) => {
                    log::info!(
                        "database file in use by another process, retrying in {:?}",
                        options.poll_interval
                    );
                    log::debug!("{msg}");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Open a second store on the same database instance
    pub fn try_clone(&self) -> StoreResult<Self> {
        Ok(Self::new(self.backend.try_clone()?))
    }

    /// DDL statements describing the live schema, each terminated by `;`
    pub fn schema_statements(&self) -> StoreResult<Vec<String>> {
        let statements = self.backend.with_conn(|conn| {
            let mut stmt = conn.prepare(DUMP_SQL)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut statements = Vec::new();
            for sql in rows {
                let mut sql = sql?.trim().to_string();
                if !sql.ends_with(';') {
                    sql.push(';');
                }
                statements.push(sql);
            }
            Ok(statements)
        })?;
        Ok(statements)
    }
}

#[async_trait]
impl SchemaStore for DuckDbStore {
    fn database(&self) -> &dyn Database {
        &self.backend
    }

    async fn initialize(&self) -> StoreResult<()> {
        self.backend
            .with_conn(|conn| transaction(conn, |conn| Ok(conn.execute_batch(INIT_SQL)?)))?;
        log::debug!("schema version tables present");
        Ok(())
    }

    async fn try_acquire_lock(&self) -> StoreResult<LockAttempt> {
        let insert = format!("INSERT INTO schema_lock (id) VALUES ({LOCK_ID})");
        match self.backend.execute_sync(&insert) {
            Ok(_) => Ok(LockAttempt::Acquired),
            Err(e) if e.is_contention() => {
                log::debug!("lock insert rejected: {e}");
                Ok(LockAttempt::Contended)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn release_lock(&self) -> StoreResult<()> {
        let deleted = self
            .backend
            .execute_sync(&format!("DELETE FROM schema_lock WHERE id = {LOCK_ID}"))?;
        if deleted == 0 {
            log::warn!("released schema write lock, but no lock row was present");
        } else {
            log::debug!("released schema write lock");
        }
        Ok(())
    }

    async fn lock_held(&self) -> StoreResult<bool> {
        let held = self.backend.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM schema_lock WHERE id = ?",
                duckdb::params![LOCK_ID],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })?;
        Ok(held)
    }

    async fn applied_versions(&self) -> StoreResult<Vec<u64>> {
        let ids = self.backend.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT version_id FROM schema_migrations ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, u64>(0))?;
            let mut ids = Vec::new();
            for id in rows {
                ids.push(id?);
            }
            Ok(ids)
        })?;

        log::debug!("read migration state, {} applied", ids.len());
        validate_ledger(&ids)?;
        Ok(ids)
    }

    async fn record_applied(&self, id: u64) -> StoreResult<()> {
        self.backend.with_conn(|conn| {
            transaction(conn, |conn| {
                conn.execute(
                    "INSERT INTO schema_migrations (version_id) VALUES (?)",
                    duckdb::params![id],
                )?;
                Ok(())
            })
        })?;
        log::debug!("commit migration {id}");
        Ok(())
    }

    async fn record_reverted(&self, id: u64) -> StoreResult<()> {
        let deleted = self.backend.with_conn(|conn| {
            transaction(conn, |conn| {
                Ok(conn.execute(
                    "DELETE FROM schema_migrations WHERE version_id = ?",
                    duckdb::params![id],
                )?)
            })
        })?;
        if deleted == 0 {
            return Err(StoreError::LedgerCorrupt(format!(
                "no ledger entry for version {id}"
            )));
        }
        log::debug!("revert migration {id}");
        Ok(())
    }

    async fn dump_schema(&self, sink: &mut (dyn Write + Send)) -> StoreResult<()> {
        let statements = self.schema_statements()?;
        for stmt in &statements {
            writeln!(sink, "{stmt}")?;
        }
        sink.flush()?;
        log::debug!("dumped {} schema statements", statements.len());
        Ok(())
    }

    async fn load_schema(&self, source: &mut (dyn Read + Send)) -> StoreResult<()> {
        let mut sql = String::new();
        source.read_to_string(&mut sql)?;
        if sql.trim().is_empty() {
            return Ok(());
        }
        self.backend
            .with_conn(|conn| transaction(conn, |conn| Ok(conn.execute_batch(&sql)?)))?;
        log::debug!("loaded schema definition");
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.backend.close()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_duckdb_test.rs"]
mod tests;
