//! create users

use td_migrate::{BoxFuture, Database, MigrationUnit, UnitError, UnitResult};

pub fn unit() -> MigrationUnit {
    MigrationUnit::new(1748577600, "create users", up).with_down(down)
}

fn up(db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async move {
        db.execute_in_transaction(
            "CREATE SEQUENCE user_ids;
             CREATE TABLE users (
                 id INTEGER PRIMARY KEY DEFAULT nextval('user_ids'),
                 username VARCHAR UNIQUE NOT NULL,
                 created_at TIMESTAMP NOT NULL DEFAULT current_timestamp
             );",
        )
        .await
        .map_err(UnitError::from)
    })
}

fn down(db: &dyn Database) -> BoxFuture<'_, UnitResult> {
    Box::pin(async move {
        db.execute_in_transaction("DROP TABLE users; DROP SEQUENCE user_ids;")
            .await
            .map_err(UnitError::from)
    })
}
