//! Migration authoring: unit file skeletons and the `mod.rs` index.
//!
//! Units live in one directory as `m<id>_<name>.rs`, ids zero-padded to ten
//! digits so file name order is id order. The generated `mod.rs` declares
//! every unit module and lists them in `all()`, which the binary feeds to
//! [`Registry::new`](crate::Registry::new).

use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, Utc};
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::{Path, PathBuf};

const UNIT_TEMPLATE: &str = r#"//! {{ description }}

use td_migrate::{BoxFuture, Database, MigrationUnit, UnitResult};

pub fn unit() -> MigrationUnit {
    MigrationUnit::new({{ id }}, "{{ description }}", up).with_down(down)
}

fn up(_db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async { UnitResult::Err("migration {{ id }} up not implemented".into()) })
}

fn down(_db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async { UnitResult::Err("migration {{ id }} down not implemented".into()) })
}
"#;

const INDEX_TEMPLATE: &str = r#"//! Migration unit index. Regenerated by `td db new`; do not edit.

use td_migrate::MigrationUnit;

{% for module in modules %}
mod {{ module }};
{% endfor %}

pub fn all() -> Vec<MigrationUnit> {
    vec![
{% for module in modules %}
        {{ module }}::unit(),
{% endfor %}
    ]
}
"#;

/// File name of the generated index
pub const INDEX_FILE: &str = "mod.rs";

/// A unit source file found in a migrations directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFile {
    pub id: u64,
    /// Module name, the file stem
    pub module: String,
    pub path: PathBuf,
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
}

/// Check that `name` is a lowercase identifier usable in a module name
pub fn validate_name(name: &str) -> MigrateResult<()> {
    let invalid = |reason: &str| MigrateError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("name is empty"));
    };
    if !first.is_ascii_lowercase() {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(invalid("only lowercase letters, digits, and '_' are allowed"));
    }
    Ok(())
}

/// Parse `m<digits>_<name>.rs`; other files yield `None`.
fn parse_unit_file(path: &Path) -> Option<UnitFile> {
    if path.extension().and_then(|e| e.to_str()) != Some("rs") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (digits, _name) = stem.strip_prefix('m')?.split_once('_')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(UnitFile {
        id: digits.parse().ok()?,
        module: stem.to_string(),
        path: path.to_path_buf(),
    })
}

/// Unit files in `dir`, sorted by file name. A missing directory is empty.
pub fn discover_units(dir: &Path) -> MigrateResult<Vec<UnitFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;

    let mut units = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if let Some(unit) = parse_unit_file(&path) {
            units.push(unit);
        }
    }
    units.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(units)
}

/// Write a skeleton unit stamped with `timestamp` and regenerate the index.
///
/// Returns the path of the new unit file.
pub fn new_unit(dir: &Path, name: &str, timestamp: DateTime<Utc>) -> MigrateResult<PathBuf> {
    validate_name(name)?;
    let id = u64::try_from(timestamp.timestamp())
        .map_err(|_| MigrateError::InvalidTimestamp(timestamp.to_rfc3339()))?;

    if discover_units(dir)?.iter().any(|unit| unit.id == id) {
        return Err(MigrateError::DuplicateId { id });
    }

    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    let path = dir.join(format!("m{id:010}_{name}.rs"));

    let source = environment().render_str(
        UNIT_TEMPLATE,
        context! { id => id, description => name.replace('_', " ") },
    )?;
    std::fs::write(&path, source).map_err(|e| io_error(&path, e))?;
    log::info!("created migration {}", path.display());

    regenerate_index(dir)?;
    Ok(path)
}

/// Rewrite `mod.rs` in `dir` to list every unit file
pub fn regenerate_index(dir: &Path) -> MigrateResult<PathBuf> {
    let modules: Vec<String> = discover_units(dir)?
        .into_iter()
        .map(|unit| unit.module)
        .collect();
    log::debug!("writing migration index with {} units", modules.len());
    let source = environment().render_str(INDEX_TEMPLATE, context! { modules => modules })?;

    let path = dir.join(INDEX_FILE);
    std::fs::write(&path, source).map_err(|e| io_error(&path, e))?;
    Ok(path)
}

fn io_error(path: &Path, cause: std::io::Error) -> MigrateError {
    MigrateError::Io {
        path: path.display().to_string(),
        cause,
    }
}

#[cfg(test)]
#[path = "authoring_test.rs"]
mod tests;
