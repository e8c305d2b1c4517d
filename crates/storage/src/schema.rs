//! Relational schema for nodes and edges.
//!
//! Edges reference nodes through foreign keys with `ON DELETE CASCADE`, so
//! removing a node removes every incident edge inside the same statement.
//! Properties are stored as JSON object text and queried with SQLite's JSON1
//! functions.

use rusqlite::Connection;
use trellis_core::TrellisResult;

use crate::error::SqliteResultExt;

/// Columns selected for a node, in rehydration order.
pub const NODE_COLUMNS: &str = "id, type, properties, created_at, updated_at";

/// Number of columns in [`NODE_COLUMNS`].
pub const NODE_WIDTH: usize = 5;

/// Columns selected for an edge, in rehydration order.
pub const EDGE_COLUMNS: &str = "id, type, from_id, to_id, properties, created_at";

/// Number of columns in [`EDGE_COLUMNS`].
pub const EDGE_WIDTH: usize = 6;

const DDL: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    type        TEXT    NOT NULL,
    properties  TEXT    NOT NULL DEFAULT '{}',
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS edges (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    type        TEXT    NOT NULL,
    from_id     INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    to_id       INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    properties  TEXT,
    created_at  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_type      ON nodes(type);
CREATE INDEX IF NOT EXISTS idx_edges_from_type ON edges(from_id, type);
CREATE INDEX IF NOT EXISTS idx_edges_to_type   ON edges(to_id, type);
CREATE INDEX IF NOT EXISTS idx_edges_type      ON edges(type);
";

/// Create tables and indexes if they do not exist yet.
pub fn initialize(conn: &Connection) -> TrellisResult<()> {
    conn.execute_batch(DDL).map_store_err()
}
