//! Transaction-control statements.
//!
//! Transactions are driven with explicit SQL rather than `rusqlite`'s RAII
//! transaction type: the engine tracks the finalize-once state itself and
//! needs the connection free for re-entrant reads while a unit of work runs.

use rusqlite::Connection;
use trellis_core::{TrellisError, TrellisResult};
use tracing::trace;

use crate::error::SqliteResultExt;

/// Longest accepted savepoint name.
pub const MAX_SAVEPOINT_NAME: usize = 64;

/// Savepoint names become SQL identifiers, so they are restricted to
/// `[A-Za-z0-9_]` and must not start with a digit.
pub fn validate_savepoint_name(name: &str) -> TrellisResult<()> {
    if name.is_empty() {
        return Err(TrellisError::invalid_input("savepoint name must not be empty"));
    }
    if name.len() > MAX_SAVEPOINT_NAME {
        return Err(TrellisError::invalid_input(format!(
            "savepoint name exceeds {} characters",
            MAX_SAVEPOINT_NAME
        )));
    }
    if name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(TrellisError::invalid_input(format!(
            "savepoint name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
            name
        )));
    }
    Ok(())
}

/// Start a write transaction, taking the database write lock immediately so
/// contention surfaces here rather than on the first write.
pub fn begin(conn: &Connection) -> TrellisResult<()> {
    trace!("BEGIN IMMEDIATE");
    conn.execute_batch("BEGIN IMMEDIATE").map_store_err()
}

/// Commit the open transaction.
pub fn commit(conn: &Connection) -> TrellisResult<()> {
    trace!("COMMIT");
    conn.execute_batch("COMMIT").map_store_err()
}

/// Roll back the open transaction.
pub fn rollback(conn: &Connection) -> TrellisResult<()> {
    trace!("ROLLBACK");
    conn.execute_batch("ROLLBACK").map_store_err()
}

/// Push a savepoint.
pub fn savepoint(conn: &Connection, name: &str) -> TrellisResult<()> {
    validate_savepoint_name(name)?;
    trace!(savepoint = name, "SAVEPOINT");
    conn.execute_batch(&format!("SAVEPOINT \"{}\"", name))
        .map_store_err()
}

/// Undo everything since `name`; the savepoint itself stays open.
pub fn rollback_to(conn: &Connection, name: &str) -> TrellisResult<()> {
    validate_savepoint_name(name)?;
    trace!(savepoint = name, "ROLLBACK TO");
    conn.execute_batch(&format!("ROLLBACK TO SAVEPOINT \"{}\"", name))
        .map_store_err()
}

/// Release `name` (and every later savepoint) into the enclosing scope.
pub fn release(conn: &Connection, name: &str) -> TrellisResult<()> {
    validate_savepoint_name(name)?;
    trace!(savepoint = name, "RELEASE");
    conn.execute_batch(&format!("RELEASE SAVEPOINT \"{}\"", name))
        .map_store_err()
}
