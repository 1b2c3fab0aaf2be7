//! Postgres backend for relaybox: sqlx-based outbox storage plus
//! heartbeat-row leader election against the same database.
//!
//! The expected schema ships as `schema.sql` next to this crate; installing
//! it is an operator concern.

mod election;
mod store;

pub use election::PostgresLeaderElection;
pub use store::PostgresStore;

use relaybox_core::prelude::OutboxError;

pub(crate) fn storage_error(e: sqlx::Error) -> OutboxError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            OutboxError::ConstraintViolation(db.message().to_owned())
        }
        _ => OutboxError::Storage(e.to_string()),
    }
}
