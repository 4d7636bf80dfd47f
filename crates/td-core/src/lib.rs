//! td-core - Core library for Tilde
//!
//! This crate provides configuration parsing for `tilde.yml` and the core
//! error type shared by the Tilde crates.

pub mod config;
pub mod error;

pub use config::{Config, DatabaseConfig, MigrationsConfig, SchemaConfig};
pub use error::{CoreError, CoreResult};
