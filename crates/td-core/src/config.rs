//! Configuration types and parsing for tilde.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `database.path`
pub const DATABASE_ENV_VAR: &str = "TILDE_DATABASE";

/// Main project configuration from tilde.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Migration discovery and locking settings
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Schema snapshot settings
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Migration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Directory holding the authored migration unit sources
    #[serde(default = "default_migrations_dir")]
    pub dir: String,

    /// How long a run waits for the migration lock
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Delay between lock acquisition attempts
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            lock_timeout_secs: default_lock_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Schema snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Snapshot file written by `db dump` and read by `db load`
    #[serde(default = "default_schema_path")]
    pub path: String,

    /// Dump a fresh snapshot after every successful `db up`
    #[serde(default)]
    pub dump_after_migrate: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: default_schema_path(),
            dump_after_migrate: false,
        }
    }
}

fn default_db_path() -> String {
    "data/tilde.duckdb".to_string()
}

fn default_migrations_dir() -> String {
    "crates/td-cli/src/migrations".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_schema_path() -> String {
    "db/schema.sql".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "tilde".to_string(),
            database: DatabaseConfig::default(),
            migrations: MigrationsConfig::default(),
            schema: SchemaConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            cause: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for tilde.yml or tilde.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tilde.yml");
        let yaml_path = dir.join("tilde.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }
        if self.database.path.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }
        if self.migrations.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "migrations.poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the database path from CLI flag, TILDE_DATABASE, or config
    ///
    /// Priority: CLI flag > TILDE_DATABASE env var > tilde.yml
    pub fn resolve_database_path(&self, cli_database: Option<&str>) -> String {
        cli_database
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV_VAR).ok())
            .unwrap_or_else(|| self.database.path.clone())
    }

    /// Get absolute migrations directory relative to a project root
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations.dir)
    }

    /// Get absolute snapshot path relative to a project root
    pub fn schema_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.schema.path)
    }

    /// Lock acquisition timeout
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.migrations.lock_timeout_secs)
    }

    /// Delay between lock acquisition attempts
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.migrations.poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
