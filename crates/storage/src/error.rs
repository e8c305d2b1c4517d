//! Classification of SQLite failures into the Trellis error taxonomy.
//!
//! The write serializer depends on busy/locked being distinguishable from
//! constraint violations: the former is retried, the latter never is.

use rusqlite::ErrorCode;
use trellis_core::TrellisError;

/// Map a `rusqlite::Error` to a [`TrellisError`].
pub fn classify(err: rusqlite::Error) -> TrellisError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    TrellisError::contention(message)
                }
                ErrorCode::ConstraintViolation => TrellisError::constraint(message),
                _ => TrellisError::storage_with_source(format!("SQLite error: {}", message), err),
            }
        }
        _ => TrellisError::storage_with_source(format!("SQLite error: {}", err), err),
    }
}

/// `?`-friendly conversion for `rusqlite` results.
pub trait SqliteResultExt<T> {
    /// Classify the error, if any.
    fn map_store_err(self) -> Result<T, TrellisError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn map_store_err(self) -> Result<T, TrellisError> {
        self.map_err(classify)
    }
}
