//! Relational storage layer for Trellis.
//!
//! This crate owns the SQLite side of the graph:
//! - `SqliteStore`: writer/reader connections and pragmas
//! - `schema`: `nodes` and `edges` tables with cascading foreign keys
//! - `Access`: the statement interface compiled plans run against
//! - `txn`: transaction and savepoint control statements
//! - `error`: busy/locked vs constraint classification

#![warn(missing_docs)]

pub mod access;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod txn;

pub use access::{Access, Row, SqlValue};
pub use error::{classify, SqliteResultExt};
pub use sqlite::{SqliteStore, StoreOptions, DEFAULT_BUSY_TIMEOUT};
