//! Integration tests for the `td` binary.
//!
//! Each test writes a throwaway project with its own `tilde.yml` and
//! database file, then drives the compiled-in migrations through the CLI.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use td_db::DuckDbBackend;
use tempfile::TempDir;

// ── Helpers ────────────────────────────────────────────────────────────

fn td_bin() -> String {
    env!("CARGO_BIN_EXE_td").to_string()
}

/// Run `td` in `project` and return (stdout, stderr, exit code).
fn run_td(project: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(td_bin())
        .arg("-p")
        .arg(project)
        .args(args)
        .env_remove("TILDE_DATABASE")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute td with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Start `td` in `project` without waiting for it.
fn spawn_td(project: &Path, args: &[&str]) -> Child {
    Command::new(td_bin())
        .arg("-p")
        .arg(project)
        .args(args)
        .env_remove("TILDE_DATABASE")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to spawn td with args {:?}: {}", args, e))
}

fn finish(child: Child) -> (String, String, i32) {
    let output = child.wait_with_output().unwrap();
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn project() -> TempDir {
    project_with_timeout(1)
}

fn project_with_timeout(lock_timeout_secs: u64) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("tilde.yml"),
        format!(
            r#"
name: cli_test
database:
  path: data/app.duckdb
migrations:
  dir: migrations
  lock_timeout_secs: {lock_timeout_secs}
  poll_interval_ms: 50
schema:
  path: db/schema.sql
"#
        ),
    )
    .unwrap();
    temp
}

/// Open the project's database from this process, as another migrator would.
fn hold_database(project: &Path) -> DuckDbBackend {
    let data = project.join("data");
    std::fs::create_dir_all(&data).unwrap();
    DuckDbBackend::new(data.join("app.duckdb").to_str().unwrap()).unwrap()
}

fn status_json(project: &Path) -> serde_json::Value {
    let (stdout, stderr, code) = run_td(project, &["db", "status", "-o", "json"]);
    assert_eq!(code, 0, "status failed: {stderr}");
    serde_json::from_str(&stdout).unwrap()
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_up_applies_compiled_migrations() {
    let project = project();
    let (stdout, stderr, code) = run_td(project.path(), &["db", "up"]);
    assert_eq!(code, 0, "up failed: {stderr}");
    assert!(stdout.contains("applied  1748577600"), "{stdout}");

    let status = status_json(project.path());
    assert_eq!(status["current"], 1748664000);
    assert_eq!(status["locked"], false);

    let (stdout, _, code) = run_td(project.path(), &["db", "up"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Schema up to date at 1748664000"));
}

#[test]
fn test_up_to_initial_reverts_everything() {
    let project = project();
    run_td(project.path(), &["db", "up"]);

    let (stdout, stderr, code) = run_td(project.path(), &["db", "up", "--to", "initial"]);
    assert_eq!(code, 0, "revert failed: {stderr}");
    assert!(stdout.contains("reverted 1748664000"));
    assert!(status_json(project.path())["current"].is_null());
}

#[test]
fn test_unknown_target_fails() {
    let project = project();
    let (_, stderr, code) = run_td(project.path(), &["db", "up", "--to", "7"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown version: 7"), "{stderr}");
}

#[test]
fn test_invalid_target_is_usage_error() {
    let project = project();
    let (_, _, code) = run_td(project.path(), &["db", "up", "--to", "tomorrow"]);
    assert_eq!(code, 2);
}

#[test]
fn test_dump_then_load_with_baseline() {
    let source = project();
    run_td(source.path(), &["db", "up"]);
    let (stdout, stderr, code) = run_td(source.path(), &["db", "dump"]);
    assert_eq!(code, 0, "dump failed: {stderr}");
    assert!(stdout.contains("version 1748664000"));

    let snapshot = source.path().join("db/schema.sql");
    let text = std::fs::read_to_string(&snapshot).unwrap();
    assert!(text.starts_with("-- tilde schema version: 1748664000\n"));
    assert!(text.contains("CREATE TABLE users"));
    assert!(!text.contains("schema_migrations"));

    let target = project();
    let (_, stderr, code) = run_td(
        target.path(),
        &["db", "load", "-f", snapshot.to_str().unwrap(), "--baseline"],
    );
    assert_eq!(code, 0, "load failed: {stderr}");

    let status = status_json(target.path());
    assert_eq!(status["current"], 1748664000);
    let (stdout, _, _) = run_td(target.path(), &["db", "up"]);
    assert!(stdout.contains("Schema up to date"));
}

#[test]
fn test_load_into_migrated_database_fails() {
    let project = project();
    run_td(project.path(), &["db", "up"]);
    run_td(project.path(), &["db", "dump"]);

    let (_, stderr, code) = run_td(project.path(), &["db", "load"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already recorded in the ledger"), "{stderr}");
}

#[test]
fn test_dump_to_stdout() {
    let project = project();
    run_td(project.path(), &["db", "up", "--to", "1748577600"]);

    let (stdout, _, code) = run_td(project.path(), &["db", "dump", "-o", "-"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("-- tilde schema version: 1748577600\n"));
    assert!(!stdout.contains("sessions"));
}

#[test]
fn test_unlock_without_lock() {
    let project = project();
    let (stdout, _, code) = run_td(project.path(), &["db", "unlock"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("not held"));
}

#[test]
fn test_new_writes_unit_and_index() {
    let project = project();
    let (stdout, stderr, code) = run_td(project.path(), &["db", "new", "add_email"]);
    assert_eq!(code, 0, "new failed: {stderr}");
    assert!(stdout.contains("_add_email.rs"));

    let index = std::fs::read_to_string(project.path().join("migrations/mod.rs")).unwrap();
    assert!(index.contains("_add_email;"));
    assert!(index.contains("pub fn all() -> Vec<MigrationUnit>"));
}

#[test]
fn test_new_rejects_invalid_name() {
    let project = project();
    let (_, stderr, code) = run_td(project.path(), &["db", "new", "AddEmail"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid migration name"), "{stderr}");
}

#[test]
fn test_load_with_unknown_baseline_leaves_database_untouched() {
    let project = project();
    let snapshot = project.path().join("snap.sql");
    std::fs::write(
        &snapshot,
        "-- tilde schema version: 999\nCREATE TABLE z(id INTEGER);\n",
    )
    .unwrap();
    let file = snapshot.to_str().unwrap();

    let (_, stderr, code) = run_td(project.path(), &["db", "load", "-f", file, "--baseline"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown version: 999"), "{stderr}");

    let (stdout, _, code) = run_td(project.path(), &["db", "dump", "-o", "-"]);
    assert_eq!(code, 0);
    assert!(!stdout.contains("CREATE TABLE z"), "{stdout}");

    // the snapshot can still be loaded once the version problem is dropped
    let (_, stderr, code) = run_td(project.path(), &["db", "load", "-f", file]);
    assert_eq!(code, 0, "load failed: {stderr}");
}

#[test]
fn test_up_waits_for_database_held_by_another_process() {
    let project = project();
    let holder = hold_database(project.path());

    let started = Instant::now();
    let (_, stderr, code) = run_td(project.path(), &["db", "up"]);
    let waited = started.elapsed();

    assert_eq!(code, 1);
    assert!(stderr.contains("[S002]"), "{stderr}");
    assert!(!stderr.contains("[S001]"), "{stderr}");
    assert!(waited >= Duration::from_millis(900), "gave up after {waited:?}");

    holder.close().unwrap();
    let (_, stderr, code) = run_td(project.path(), &["db", "up"]);
    assert_eq!(code, 0, "up failed after release: {stderr}");
}

#[test]
fn test_concurrent_processes_apply_each_unit_once() {
    let project = project_with_timeout(30);

    let first = spawn_td(project.path(), &["db", "up"]);
    let second = spawn_td(project.path(), &["db", "up"]);
    let runs = [finish(first), finish(second)];

    for (_, stderr, code) in &runs {
        assert_eq!(*code, 0, "concurrent up failed: {stderr}");
    }
    let migrated = runs
        .iter()
        .filter(|(stdout, _, _)| stdout.contains("Migrated"))
        .count();
    let up_to_date = runs
        .iter()
        .filter(|(stdout, _, _)| stdout.contains("Schema up to date"))
        .count();
    assert_eq!((migrated, up_to_date), (1, 1), "{runs:?}");

    let status = status_json(project.path());
    assert_eq!(status["current"], 1748664000);
    assert_eq!(status["locked"], false);
}
