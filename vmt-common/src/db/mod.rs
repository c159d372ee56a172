//! Database schema, models and queries

pub mod accounts;
pub mod fuel;
pub mod future;
pub mod init;
pub mod maintenance;
pub mod migrations;
pub mod models;
pub mod subscriptions;
pub mod vehicles;

pub use init::*;
pub use migrations::*;
pub use models::*;

use crate::Error;

/// Map a UNIQUE constraint failure to `Conflict`, anything else to `Database`
pub(crate) fn unique_violation(err: sqlx::Error, message: &str) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::Database(err),
    }
}

/// Trim a free-text field, turning blank into `None`
pub(crate) fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
