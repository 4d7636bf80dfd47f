//! td-migrate - Schema migration engine for Tilde
//!
//! Applies and reverts hand-authored [`MigrationUnit`]s against a
//! [`SchemaStore`](td_db::SchemaStore), one unit at a time, under the
//! store's cross-process migration lock.
//!
//! A run that fails partway through leaves the lock held. Later runs then
//! time out waiting for it until an operator inspects the database and calls
//! [`Migrator::force_unlock`].

pub mod authoring;
pub mod error;
pub mod migrator;
pub mod snapshot;
pub mod unit;

pub use error::{Direction, ErrorKind, MigrateError, MigrateResult};
pub use migrator::{MigrationReport, Migrator, SeedReport, StatusReport, Target, UnitStatus};
pub use snapshot::Snapshot;
pub use unit::{MigrationUnit, Registry, UnitError, UnitFn, UnitResult};

pub use futures::future::BoxFuture;
pub use td_db::Database;
