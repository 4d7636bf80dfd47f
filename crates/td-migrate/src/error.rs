//! Error types for td-migrate

use crate::unit::UnitError;
use serde::Serialize;
use std::fmt;
use td_db::StoreError;
use thiserror::Error;

/// Which procedure of a unit was running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Coarse classification used by callers to pick a recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Target id not in the registry; pick a valid id
    UnknownVersion,
    /// Connectivity or permission failure in the store
    StoreUnavailable,
    /// Lock not obtained in time; retry later
    LockTimeout,
    /// Ledger ordering invariant violated; never auto-repaired
    LedgerCorrupt,
    /// A unit's procedure failed; the lock is left held
    UnitExecutionFailed,
    /// Two units share an id
    DuplicateId,
    /// Operation requires an empty ledger
    LedgerNotEmpty,
    /// Migration file generation failed
    Authoring,
}

/// Migration engine errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// T001: Target version is not a registered unit
    #[error("[T001] Unknown version: {0}")]
    UnknownVersion(u64),

    /// T002: Target string could not be parsed
    #[error("[T002] Invalid migration target '{input}': expected a version id, 'latest', or 'initial'")]
    InvalidTarget { input: String },

    /// Store failure outside any unit
    #[error(transparent)]
    Store(#[from] StoreError),

    /// T003: A unit's up or down procedure failed
    #[error("[T003] {direction} migration {id} failed: {cause}")]
    UnitExecutionFailed {
        id: u64,
        direction: Direction,
        cause: UnitError,
    },

    /// T004: A unit ran but its ledger entry could not be written
    #[error("[T004] {direction} migration {id} ran but the ledger update failed: {cause}")]
    LedgerUpdateFailed {
        id: u64,
        direction: Direction,
        cause: StoreError,
    },

    /// T005: Revert requested for a unit without a down procedure
    #[error("[T005] Migration {id} has no down procedure and cannot be reverted")]
    Irreversible { id: u64 },

    /// T006: Two units share an id
    #[error("[T006] Duplicate migration id {id}")]
    DuplicateId { id: u64 },

    /// T007: Operation requires an empty ledger
    #[error("[T007] Cannot {operation}: {applied} migration(s) already recorded in the ledger")]
    LedgerNotEmpty {
        operation: &'static str,
        applied: usize,
    },

    /// T008: Migration name is not usable as a module name
    #[error("[T008] Invalid migration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// T009: Authoring timestamp precedes the epoch
    #[error("[T009] Migration timestamp {0} is before 1970-01-01")]
    InvalidTimestamp(String),

    /// T010: File IO with path context
    #[error("[T010] IO error on '{path}': {cause}")]
    Io {
        path: String,
        cause: std::io::Error,
    },

    /// T011: Template rendering failed
    #[error("[T011] Template rendering failed: {0}")]
    Template(minijinja::Error),
}

// Causes are rendered in the message, so none is exposed as a source.
impl From<minijinja::Error> for MigrateError {
    fn from(err: minijinja::Error) -> Self {
        MigrateError::Template(err)
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::UnknownVersion(_) | MigrateError::InvalidTarget { .. } => {
                ErrorKind::UnknownVersion
            }
            MigrateError::Store(err) | MigrateError::LedgerUpdateFailed { cause: err, .. } => {
                store_kind(err)
            }
            MigrateError::UnitExecutionFailed { .. } | MigrateError::Irreversible { .. } => {
                ErrorKind::UnitExecutionFailed
            }
            MigrateError::DuplicateId { .. } => ErrorKind::DuplicateId,
            MigrateError::LedgerNotEmpty { .. } => ErrorKind::LedgerNotEmpty,
            MigrateError::InvalidName { .. }
            | MigrateError::InvalidTimestamp(_)
            | MigrateError::Io { .. }
            | MigrateError::Template(_) => ErrorKind::Authoring,
        }
    }

    /// Id of the unit that was running when the error occurred
    pub fn unit_id(&self) -> Option<u64> {
        match self {
            MigrateError::UnitExecutionFailed { id, .. }
            | MigrateError::LedgerUpdateFailed { id, .. }
            | MigrateError::Irreversible { id } => Some(*id),
            _ => None,
        }
    }

    /// Whether the failed run left the migration lock held
    pub fn leaves_lock_held(&self) -> bool {
        matches!(
            self,
            MigrateError::UnitExecutionFailed { .. } | MigrateError::LedgerUpdateFailed { .. }
        )
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Unavailable(_) | StoreError::Io(_) => ErrorKind::StoreUnavailable,
        StoreError::LockTimeout { .. } | StoreError::LockCancelled => ErrorKind::LockTimeout,
        StoreError::LedgerCorrupt(_) => ErrorKind::LedgerCorrupt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unit_failure_names_unit_and_direction() {
        let err = MigrateError::UnitExecutionFailed {
            id: 2,
            direction: Direction::Up,
            cause: "boom".into(),
        };
        assert_eq!(err.to_string(), "[T003] up migration 2 failed: boom");
        // the cause is already in the message
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(err.kind(), ErrorKind::UnitExecutionFailed);
        assert_eq!(err.unit_id(), Some(2));
        assert!(err.leaves_lock_held());
    }

    #[test]
    fn test_store_errors_classified() {
        let timeout = MigrateError::from(StoreError::LockTimeout {
            waited: Duration::from_secs(1),
        });
        assert_eq!(timeout.kind(), ErrorKind::LockTimeout);
        assert!(!timeout.leaves_lock_held());

        let corrupt = MigrateError::from(StoreError::LedgerCorrupt("dup".into()));
        assert_eq!(corrupt.kind(), ErrorKind::LedgerCorrupt);
        assert_eq!(corrupt.unit_id(), None);
    }

    #[test]
    fn test_irreversible_counts_as_unit_failure() {
        let err = MigrateError::Irreversible { id: 9 };
        assert_eq!(err.kind(), ErrorKind::UnitExecutionFailed);
        assert!(!err.leaves_lock_held());
    }
}
