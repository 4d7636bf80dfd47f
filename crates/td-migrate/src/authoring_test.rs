use super::*;
use chrono::TimeZone;
use tempfile::TempDir;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn test_new_unit_writes_skeleton_and_index() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("migrations");

    let path = new_unit(&dir, "create_users", at(1748577600)).unwrap();
    assert_eq!(path, dir.join("m1748577600_create_users.rs"));

    let source = std::fs::read_to_string(&path).unwrap();
    assert!(source.contains("MigrationUnit::new(1748577600, \"create users\", up)"));
    assert!(source.contains("migration 1748577600 up not implemented"));
    assert!(source.contains("migration 1748577600 down not implemented"));

    let index = std::fs::read_to_string(dir.join(INDEX_FILE)).unwrap();
    assert!(index.contains("mod m1748577600_create_users;\n"));
    assert!(index.contains("        m1748577600_create_users::unit(),\n"));
}

#[test]
fn test_new_unit_pads_small_ids() {
    let temp = TempDir::new().unwrap();
    let path = new_unit(temp.path(), "early", at(42)).unwrap();
    assert_eq!(path.file_name().unwrap(), "m0000000042_early.rs");
}

#[test]
fn test_new_unit_rejects_duplicate_id() {
    let temp = TempDir::new().unwrap();
    new_unit(temp.path(), "create_users", at(1748577600)).unwrap();

    let err = new_unit(temp.path(), "create_orders", at(1748577600)).unwrap_err();
    assert!(matches!(err, MigrateError::DuplicateId { id: 1748577600 }));
    assert!(!temp.path().join("m1748577600_create_orders.rs").exists());
}

#[test]
fn test_new_unit_rejects_bad_names() {
    let temp = TempDir::new().unwrap();
    for name in ["", "CreateUsers", "1st", "add-column", "drop table"] {
        let err = new_unit(temp.path(), name, at(1)).unwrap_err();
        assert!(
            matches!(err, MigrateError::InvalidName { .. }),
            "{name:?} gave {err}"
        );
    }
}

#[test]
fn test_new_unit_rejects_pre_epoch_timestamp() {
    let temp = TempDir::new().unwrap();
    let err = new_unit(temp.path(), "old", at(-5)).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidTimestamp(_)));
}

#[test]
fn test_index_lists_units_in_id_order() {
    let temp = TempDir::new().unwrap();
    new_unit(temp.path(), "second", at(200)).unwrap();
    new_unit(temp.path(), "first", at(100)).unwrap();
    std::fs::write(temp.path().join("helpers.rs"), "").unwrap();
    std::fs::write(temp.path().join("notes.md"), "").unwrap();

    let index = std::fs::read_to_string(regenerate_index(temp.path()).unwrap()).unwrap();
    let first = index.find("mod m0000000100_first;").unwrap();
    let second = index.find("mod m0000000200_second;").unwrap();
    assert!(first < second);
    assert!(!index.contains("helpers"));
}

#[test]
fn test_discover_units_missing_dir() {
    let temp = TempDir::new().unwrap();
    let units = discover_units(&temp.path().join("absent")).unwrap();
    assert!(units.is_empty());
}

#[test]
fn test_discover_units_parses_ids() {
    let temp = TempDir::new().unwrap();
    new_unit(temp.path(), "create_users", at(1748577600)).unwrap();

    let units = discover_units(temp.path()).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].id, 1748577600);
    assert_eq!(units[0].module, "m1748577600_create_users");
}
