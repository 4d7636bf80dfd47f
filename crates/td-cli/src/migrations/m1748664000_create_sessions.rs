//! create sessions

use td_migrate::{BoxFuture, Database, MigrationUnit, UnitError, UnitResult};

pub fn unit() -> MigrationUnit {
    MigrationUnit::new(1748664000, "create sessions", up).with_down(down)
}

fn up(db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async move {
        db.execute_in_transaction(
            "CREATE TABLE sessions (
                 token VARCHAR PRIMARY KEY,
                 user_id INTEGER NOT NULL REFERENCES users (id),
                 expires_at TIMESTAMP NOT NULL
             );
             CREATE INDEX sessions_user_idx ON sessions (user_id);",
        )
        .await
        .map_err(UnitError::from)
    })
}

fn down(db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async move {
        db.execute_in_transaction("DROP INDEX sessions_user_idx; DROP TABLE sessions;")
            .await
            .map_err(UnitError::from)
    })
}
