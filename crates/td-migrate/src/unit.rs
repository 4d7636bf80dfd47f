//! Migration units and the registry that orders them.

use crate::error::{MigrateError, MigrateResult};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use td_db::Database;

/// Error returned by a unit procedure
pub type UnitError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a unit procedure
pub type UnitResult = Result<(), UnitError>;

/// A forward or backward change procedure over a live connection
pub type UnitFn = for<'a> fn(&'a dyn Database) -> BoxFuture<'a, UnitResult>;

/// A single versioned schema change
///
/// Units are compiled into the program and never mutated. `id` is the only
/// ordering key; by convention it is the authoring time in seconds since the
/// epoch.
#[derive(Clone, Copy)]
pub struct MigrationUnit {
    /// Version id
    pub id: u64,

    /// Free-text label, not interpreted
    pub description: &'static str,

    /// Applies the change
    pub up: UnitFn,

    /// Reverts the change; `None` marks the unit irreversible
    pub down: Option<UnitFn>,
}

impl MigrationUnit {
    /// Create an irreversible unit
    pub fn new(id: u64, description: &'static str, up: UnitFn) -> Self {
        Self {
            id,
            description,
            up,
            down: None,
        }
    }

    /// Attach a down procedure
    pub fn with_down(mut self, down: UnitFn) -> Self {
        self.down = Some(down);
        self
    }

    /// Whether the unit can be reverted
    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("reversible", &self.is_reversible())
            .finish()
    }
}

/// Known units keyed by id, duplicate-free
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: BTreeMap<u64, MigrationUnit>,
}

impl Registry {
    /// Build a registry, rejecting any repeated id
    pub fn new(units: impl IntoIterator<Item = MigrationUnit>) -> MigrateResult<Self> {
        let mut map = BTreeMap::new();
        for unit in units {
            if map.insert(unit.id, unit).is_some() {
                return Err(MigrateError::DuplicateId { id: unit.id });
            }
        }
        log::debug!("registered {} migration units", map.len());
        Ok(Self { units: map })
    }

    /// Look up a unit by id
    pub fn get(&self, id: u64) -> Option<&MigrationUnit> {
        self.units.get(&id)
    }

    /// Whether `id` is a registered unit
    pub fn contains(&self, id: u64) -> bool {
        self.units.contains_key(&id)
    }

    /// Known ids, ascending
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = u64> + '_ {
        self.units.keys().copied()
    }

    /// Units, ascending by id
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MigrationUnit> + '_ {
        self.units.values()
    }

    /// Highest known id
    pub fn latest(&self) -> Option<u64> {
        self.units.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
#[path = "unit_test.rs"]
mod tests;
