//! td-db - Database abstraction layer for Tilde
//!
//! This crate provides the `Database` trait handed to migration units, the
//! `SchemaStore` trait the migrator drives, and DuckDB implementations of
//! both.

pub mod duckdb;
pub mod error;
pub mod store;
pub mod store_duckdb;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use store::{LockAttempt, LockOptions, SchemaStore};
pub use store_duckdb::DuckDbStore;
pub use traits::Database;
