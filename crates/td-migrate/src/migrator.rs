//! Migration orchestration
//!
//! A run moves through `Initializing -> LockAcquiring -> Applying ->
//! Committed`. It can stop early with a lock timeout, which touches nothing,
//! or abort mid-apply, which keeps the lock held. Nothing automatic leaves
//! the aborted state; [`Migrator::force_unlock`] is the manual way out.

use crate::error::{Direction, MigrateError, MigrateResult};
use crate::snapshot::write_header;
use crate::unit::Registry;
use serde::Serialize;
use std::io::{Read, Write};
use std::str::FromStr;
use td_db::{LockOptions, SchemaStore, StoreError};
use tokio::sync::Mutex;

/// Version a run should end at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No units applied
    Initial,
    /// Highest registered unit
    Latest,
    /// A specific registered unit
    Version(u64),
}

impl FromStr for Target {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "latest" => Ok(Target::Latest),
            "initial" | "none" => Ok(Target::Initial),
            other => other
                .parse()
                .map(Target::Version)
                .map_err(|_| MigrateError::InvalidTarget {
                    input: s.to_string(),
                }),
        }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Highest applied version before the run
    pub from: Option<u64>,

    /// Highest applied version after the run
    pub to: Option<u64>,

    /// Units applied, in order
    pub applied: Vec<u64>,

    /// Units reverted, in order
    pub reverted: Vec<u64>,

    /// Set when the run succeeded but the lock could not be released
    pub release_warning: Option<String>,
}

impl MigrationReport {
    /// True when the run changed nothing
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.reverted.is_empty()
    }
}

/// Outcome of a snapshot load or ledger baseline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Units recorded as applied without running, in order
    pub recorded: Vec<u64>,

    /// Set when the work succeeded but the lock could not be released
    pub release_warning: Option<String>,
}

/// Per-unit line of a [`StatusReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub id: u64,
    pub description: String,
    pub applied: bool,
}

/// Ledger and lock state compared with the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Highest applied version
    pub current: Option<u64>,

    /// Whether the migration lock is held (a run is active, or one aborted)
    pub locked: bool,

    /// Every registered unit, ascending
    pub units: Vec<UnitStatus>,

    /// Ledger entries with no registered unit
    pub unknown_applied: Vec<u64>,
}

impl StatusReport {
    /// Registered units above the current version
    pub fn pending(&self) -> impl Iterator<Item = &UnitStatus> {
        let current = self.current;
        self.units
            .iter()
            .filter(move |u| !u.applied && Some(u.id) > current)
    }
}

/// Computes and executes the delta between the registry and the ledger
pub struct Migrator<S: SchemaStore> {
    store: S,
    registry: Registry,
    lock: LockOptions,
    /// Serialises callers in this process; the store lock covers the rest.
    run_guard: Mutex<()>,
}

impl<S: SchemaStore> Migrator<S> {
    /// Create a migrator over `store` for the units in `registry`
    pub fn new(store: S, registry: Registry) -> Self {
        Self {
            store,
            registry,
            lock: LockOptions::default(),
            run_guard: Mutex::new(()),
        }
    }

    /// Override lock timeout, poll interval, or cancellation
    pub fn with_lock_options(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Apply or revert units until the ledger's highest id equals `target`.
    pub async fn apply_to_version(&self, target: Target) -> MigrateResult<MigrationReport> {
        let target = match target {
            Target::Initial => None,
            Target::Latest => match self.registry.latest() {
                Some(id) => Some(id),
                None => {
                    log::debug!("no migration units registered");
                    return Ok(MigrationReport::default());
                }
            },
            Target::Version(id) => {
                if !self.registry.contains(id) {
                    return Err(MigrateError::UnknownVersion(id));
                }
                Some(id)
            }
        };
        log::debug!("read local migrations, {} known", self.registry.len());

        let _guard = self.run_guard.lock().await;

        self.store.initialize().await?;
        self.store.acquire_lock(&self.lock).await?;

        let applied = match self.store.applied_versions().await {
            Ok(applied) => applied,
            Err(e) => return Err(self.release_after(e.into()).await),
        };
        let latest = applied.last().copied();
        let mut report = MigrationReport {
            from: latest,
            to: latest,
            ..Default::default()
        };

        if latest == target {
            log::info!("schema up to date at {}", display_version(latest));
        } else if latest < target {
            self.migrate_up(latest, target, &mut report).await?;
        } else {
            if let Err(e) = self.check_revertible(&applied, target) {
                return Err(self.release_after(e).await);
            }
            self.migrate_down(&applied, target, &mut report).await?;
        }

        report.release_warning = self.release_or_warn().await;
        Ok(report)
    }

    /// Apply every registered unit. No-op when the registry is empty.
    pub async fn apply_latest(&self) -> MigrateResult<MigrationReport> {
        self.apply_to_version(Target::Latest).await
    }

    /// Revert every applied unit
    pub async fn apply_initial(&self) -> MigrateResult<MigrationReport> {
        self.apply_to_version(Target::Initial).await
    }

    async fn migrate_up(
        &self,
        latest: Option<u64>,
        target: Option<u64>,
        report: &mut MigrationReport,
    ) -> MigrateResult<()> {
        let pending: Vec<_> = self
            .registry
            .iter()
            .filter(|unit| Some(unit.id) > latest && Some(unit.id) <= target)
            .collect();

        for unit in pending {
            log::info!("applying migration {} {}", unit.id, unit.description);
            if let Err(cause) = (unit.up)(self.store.database()).await {
                return Err(abort(MigrateError::UnitExecutionFailed {
                    id: unit.id,
                    direction: Direction::Up,
                    cause,
                }));
            }
            if let Err(cause) = self.store.record_applied(unit.id).await {
                return Err(abort(MigrateError::LedgerUpdateFailed {
                    id: unit.id,
                    direction: Direction::Up,
                    cause,
                }));
            }
            report.applied.push(unit.id);
            report.to = Some(unit.id);
        }
        Ok(())
    }

    /// Every unit to revert must be registered and have a down procedure.
    fn check_revertible(&self, applied: &[u64], target: Option<u64>) -> MigrateResult<()> {
        for &id in applied.iter().rev().filter(|&&id| Some(id) > target) {
            match self.registry.get(id) {
                None => return Err(MigrateError::UnknownVersion(id)),
                Some(unit) if !unit.is_reversible() => {
                    return Err(MigrateError::Irreversible { id })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn migrate_down(
        &self,
        applied: &[u64],
        target: Option<u64>,
        report: &mut MigrationReport,
    ) -> MigrateResult<()> {
        for (idx, &id) in applied.iter().enumerate().rev() {
            if Some(id) <= target {
                break;
            }
            // check_revertible has vetted every id above the target
            let Some(down) = self.registry.get(id).and_then(|unit| unit.down) else {
                return Err(abort(MigrateError::Irreversible { id }));
            };

            log::info!("reverting migration {id}");
            if let Err(cause) = down(self.store.database()).await {
                return Err(abort(MigrateError::UnitExecutionFailed {
                    id,
                    direction: Direction::Down,
                    cause,
                }));
            }
            if let Err(cause) = self.store.record_reverted(id).await {
                return Err(abort(MigrateError::LedgerUpdateFailed {
                    id,
                    direction: Direction::Down,
                    cause,
                }));
            }
            report.reverted.push(id);
            report.to = idx.checked_sub(1).map(|prev| applied[prev]);
        }
        Ok(())
    }

    /// Load a snapshot into a database whose ledger is empty.
    ///
    /// The ledger is not touched; call [`baseline`](Self::baseline) to mark
    /// the snapshot's units as applied before resuming incremental runs, or
    /// use [`load_and_baseline`](Self::load_and_baseline) to do both at once.
    pub async fn load_from_snapshot(
        &self,
        source: &mut (dyn Read + Send),
    ) -> MigrateResult<SeedReport> {
        self.seed(Some(source), None, "load a schema snapshot").await
    }

    /// Record every registered unit up to `version` as applied without
    /// running it. Requires an empty ledger.
    pub async fn baseline(&self, version: u64) -> MigrateResult<SeedReport> {
        self.seed(None, Some(version), "baseline the ledger").await
    }

    /// Load a snapshot and baseline the ledger at `version` under one lock.
    ///
    /// `version` is checked against the registry before the snapshot is
    /// loaded, so an unknown version leaves the database untouched.
    pub async fn load_and_baseline(
        &self,
        source: &mut (dyn Read + Send),
        version: u64,
    ) -> MigrateResult<SeedReport> {
        self.seed(Some(source), Some(version), "load a schema snapshot")
            .await
    }

    async fn seed(
        &self,
        source: Option<&mut (dyn Read + Send)>,
        baseline: Option<u64>,
        operation: &'static str,
    ) -> MigrateResult<SeedReport> {
        if let Some(version) = baseline {
            if !self.registry.contains(version) {
                return Err(MigrateError::UnknownVersion(version));
            }
        }

        let _guard = self.run_guard.lock().await;

        self.store.initialize().await?;
        self.store.acquire_lock(&self.lock).await?;

        let applied = match self.store.applied_versions().await {
            Ok(applied) => applied,
            Err(e) => return Err(self.release_after(e.into()).await),
        };
        if !applied.is_empty() {
            let err = MigrateError::LedgerNotEmpty {
                operation,
                applied: applied.len(),
            };
            return Err(self.release_after(err).await);
        }

        if let Some(source) = source {
            // load_schema runs in one transaction; a failure leaves no DDL
            if let Err(e) = self.store.load_schema(source).await {
                return Err(self.release_after(e.into()).await);
            }
            log::info!("loaded schema snapshot");
        }

        let mut recorded = Vec::new();
        if let Some(version) = baseline {
            for id in self.registry.ids().take_while(|&id| id <= version) {
                if let Err(cause) = self.store.record_applied(id).await {
                    return Err(abort(MigrateError::LedgerUpdateFailed {
                        id,
                        direction: Direction::Up,
                        cause,
                    }));
                }
                recorded.push(id);
            }
            log::info!("baselined ledger at {version} ({} units)", recorded.len());
        }

        let release_warning = self.release_or_warn().await;
        Ok(SeedReport {
            recorded,
            release_warning,
        })
    }

    /// Write a snapshot of the live schema, headed by the highest applied
    /// version. Returns that version.
    pub async fn dump_snapshot(&self, sink: &mut (dyn Write + Send)) -> MigrateResult<Option<u64>> {
        self.store.initialize().await?;
        let applied = self.store.applied_versions().await?;
        let version = applied.last().copied();

        write_header(sink, version).map_err(StoreError::Io)?;
        self.store.dump_schema(sink).await?;
        log::info!("dumped schema snapshot at {}", display_version(version));
        Ok(version)
    }

    /// Compare the ledger with the registry
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        self.store.initialize().await?;
        let applied = self.store.applied_versions().await?;
        let locked = self.store.lock_held().await?;

        let units = self
            .registry
            .iter()
            .map(|unit| UnitStatus {
                id: unit.id,
                description: unit.description.to_string(),
                applied: applied.binary_search(&unit.id).is_ok(),
            })
            .collect();
        let unknown_applied = applied
            .iter()
            .copied()
            .filter(|id| !self.registry.contains(*id))
            .collect();

        Ok(StatusReport {
            current: applied.last().copied(),
            locked,
            units,
            unknown_applied,
        })
    }

    /// Delete the lock row left by an aborted run.
    ///
    /// Only for manual recovery after the database has been inspected.
    pub async fn force_unlock(&self) -> MigrateResult<()> {
        log::warn!("forcing release of the schema write lock");
        self.store.release_lock().await?;
        Ok(())
    }

    /// Close the store
    pub async fn close(&self) -> MigrateResult<()> {
        self.store.close().await?;
        Ok(())
    }

    /// Release the lock after completed work. A failure is logged and
    /// returned as a warning; the work itself stands.
    async fn release_or_warn(&self) -> Option<String> {
        match self.store.release_lock().await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("work committed, but releasing the schema lock failed: {e}");
                Some(e.to_string())
            }
        }
    }

    /// Release the lock after a failure that left the ledger untouched.
    async fn release_after(&self, err: MigrateError) -> MigrateError {
        if let Err(release_err) = self.store.release_lock().await {
            log::error!("releasing the schema lock after '{err}' failed: {release_err}");
        }
        err
    }
}

/// Log a mid-run failure. The lock stays held.
fn abort(err: MigrateError) -> MigrateError {
    log::error!("{err}");
    log::error!(
        "migration run aborted with the schema lock held; inspect the database, then run `td db unlock`"
    );
    err
}

fn display_version(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |id| id.to_string())
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
