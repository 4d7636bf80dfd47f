//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use td_migrate::Target;

/// Tilde - versioned schema migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path (also read from TILDE_DATABASE)
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Database schema management
    Db(DbArgs),
}

/// Arguments for the db command group
#[derive(Args, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommands,
}

/// Schema subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Apply or revert migrations up to a target version
    Up(UpArgs),

    /// Create a new migration unit skeleton
    New(NewArgs),

    /// Write a snapshot of the current schema
    Dump(DumpArgs),

    /// Load a schema snapshot into an empty database
    Load(LoadArgs),

    /// Show applied and pending migrations and the lock state
    Status(StatusArgs),

    /// Release a migration lock left behind by a failed run
    Unlock,
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Target version id, `latest`, or `initial`
    #[arg(long, default_value = "latest")]
    pub to: Target,

    /// Seconds to wait for the migration lock (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name, a lowercase identifier such as `create_users`
    pub name: String,
}

/// Arguments for the dump command
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Output file, `-` for stdout (default: schema.path from config)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Snapshot file to load (default: schema.path from config)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Record the snapshot's version and everything before it as applied
    #[arg(long)]
    pub baseline: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
