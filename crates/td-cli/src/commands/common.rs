//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use td_core::{Config, CoreError};
use td_db::{DuckDbStore, LockOptions};
use td_migrate::{Migrator, Registry};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and the store is closed.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: its root directory and configuration
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

/// Load the project config from `--config` or the project directory.
///
/// A project directory without `tilde.yml` runs on defaults.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => match Config::load_from_dir(&root) {
            Ok(config) => config,
            Err(CoreError::ConfigNotFound { path }) => {
                log::debug!("no config at {path}, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to load config from {}", root.display())
                })
            }
        },
    };
    Ok(Project { root, config })
}

/// Database location for this invocation. Relative paths resolve against
/// the project root; `:memory:` is passed through.
pub(crate) fn database_path(project: &Project, global: &GlobalArgs) -> String {
    let path = project
        .config
        .resolve_database_path(global.database.as_deref());
    if path == ":memory:" || Path::new(&path).is_absolute() {
        path
    } else {
        project.root.join(path).display().to_string()
    }
}

/// Open the schema store, creating the database's parent directory if needed.
///
/// While another process has the database file open, the open is retried
/// within `lock`'s deadline and cancel signal.
pub(crate) async fn open_store(
    project: &Project,
    global: &GlobalArgs,
    lock: &LockOptions,
) -> Result<DuckDbStore> {
    let path = database_path(project, global);
    if path != ":memory:" {
        if let Some(parent) = Path::new(&path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    log::debug!("opening database {path}");
    DuckDbStore::open_waiting(&path, lock)
        .await
        .with_context(|| format!("Failed to open database {path}"))
}

/// Lock bounds from config, with an optional timeout override in seconds
pub(crate) fn lock_options(config: &Config, timeout_secs: Option<u64>) -> LockOptions {
    let timeout = timeout_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.lock_timeout());
    LockOptions::new(timeout, config.poll_interval())
}

/// Build a migrator over the units compiled into this binary.
///
/// Waiting for the database file and waiting for the migration lock share
/// one deadline.
pub(crate) async fn build_migrator(
    project: &Project,
    global: &GlobalArgs,
    mut lock: LockOptions,
) -> Result<Migrator<DuckDbStore>> {
    let registry = Registry::new(crate::migrations::all()).context("Invalid migration set")?;
    let started = Instant::now();
    let store = open_store(project, global, &lock).await?;
    lock.timeout = lock.timeout.saturating_sub(started.elapsed());
    Ok(Migrator::new(store, registry).with_lock_options(lock))
}

/// Resolve a user-supplied path against the project root
pub(crate) fn project_path(project: &Project, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project.root.join(path)
    }
}

/// Display an optional version id
pub(crate) fn version_label(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |id| id.to_string())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
