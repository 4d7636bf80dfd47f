use super::*;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert!(db.relation_exists("t2").await.unwrap());
}

#[tokio::test]
async fn test_query_count() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE nums AS SELECT * FROM range(10) t(n)")
        .await
        .unwrap();

    let count = db.query_count("SELECT * FROM nums").await.unwrap();
    assert_eq!(count, 10);
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_relation_exists_schema_qualified() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA staging; CREATE TABLE staging.events (id INT);")
        .await
        .unwrap();

    assert!(db.relation_exists("staging.events").await.unwrap());
    assert!(!db.relation_exists("events").await.unwrap());
}

#[tokio::test]
async fn test_transaction_rolls_back_on_failure() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db
        .execute_in_transaction("CREATE TABLE users (id INT); SELECT * FROM missing_table;")
        .await;

    assert!(result.is_err());
    assert!(!db.relation_exists("users").await.unwrap());
}

#[tokio::test]
async fn test_transaction_commits() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_in_transaction("CREATE TABLE users (id INT); INSERT INTO users VALUES (1);")
        .await
        .unwrap();

    assert_eq!(db.query_count("SELECT * FROM users").await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_key_is_constraint_violation() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE locks (id INTEGER PRIMARY KEY); INSERT INTO locks VALUES (1);")
        .await
        .unwrap();

    let err = db.execute("INSERT INTO locks VALUES (1)").await.unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)), "{err}");
    assert!(err.is_contention());
}

#[tokio::test]
async fn test_missing_table_is_not_contention() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute("INSERT INTO nowhere VALUES (1)").await.unwrap_err();
    assert!(!err.is_contention());
}

#[tokio::test]
async fn test_try_clone_shares_database() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE shared (id INT)").await.unwrap();

    let other = db.try_clone().unwrap();
    assert!(other.relation_exists("shared").await.unwrap());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.close().unwrap();
    db.close().unwrap();

    let err = db.execute("SELECT 1").await.unwrap_err();
    assert!(matches!(err, DbError::Closed));
}

#[tokio::test]
async fn test_duplicate_create_is_execution_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE z (id INTEGER)").await.unwrap();

    let err = db
        .execute_batch("CREATE TABLE z (id INTEGER)")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)), "{err}");
}

#[tokio::test]
async fn test_select_missing_table_is_table_not_found() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.query_count("SELECT * FROM missing").await.unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "{err}");
}
