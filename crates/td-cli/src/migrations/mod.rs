//! Migration unit index. Regenerated by `td db new`; do not edit.

use td_migrate::MigrationUnit;

mod m1748577600_create_users;
mod m1748664000_create_sessions;

pub fn all() -> Vec<MigrationUnit> {
    vec![
        m1748577600_create_users::unit(),
        m1748664000_create_sessions::unit(),
    ]
}
