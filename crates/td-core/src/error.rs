//! Error types for td-core

use thiserror::Error;

/// Core error type for Tilde
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: IO error with file path context
    #[error("[C003] Failed to read '{path}': {cause}")]
    IoWithPath {
        path: String,
        cause: std::io::Error,
    },

    /// C004: YAML parse error
    #[error("[C004] Failed to parse config: {0}")]
    YamlParse(serde_yaml::Error),
}

// Causes are rendered in the message, so none is exposed as a source.
impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::YamlParse(err)
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
