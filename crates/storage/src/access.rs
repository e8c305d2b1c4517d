//! The statement-level interface the graph engine consumes.
//!
//! Everything above the storage crate talks to SQLite through [`Access`]:
//! a statement plus positional parameters in, owned rows out. Both a bare
//! connection (inside a transaction) and the store's read path implement it,
//! so compiled plans run unchanged in either context.

use rusqlite::Connection;
use trellis_core::{TrellisError, TrellisResult};

use crate::error::SqliteResultExt;

/// A bound SQL parameter or result cell.
pub type SqlValue = rusqlite::types::Value;

/// One owned result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<SqlValue>);

impl Row {
    /// Wrap raw cells.
    pub fn new(cells: Vec<SqlValue>) -> Self {
        Row(cells)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw cell.
    pub fn cell(&self, idx: usize) -> TrellisResult<&SqlValue> {
        self.0
            .get(idx)
            .ok_or_else(|| TrellisError::serialization(format!("row has no column {}", idx)))
    }

    /// Integer cell.
    pub fn i64(&self, idx: usize) -> TrellisResult<i64> {
        match self.cell(idx)? {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(unexpected(idx, "integer", other)),
        }
    }

    /// Text cell.
    pub fn text(&self, idx: usize) -> TrellisResult<&str> {
        match self.cell(idx)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(unexpected(idx, "text", other)),
        }
    }

    /// Nullable text cell.
    pub fn opt_text(&self, idx: usize) -> TrellisResult<Option<&str>> {
        match self.cell(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s)),
            other => Err(unexpected(idx, "text or null", other)),
        }
    }

    /// Columns `[start, start + n)` as a new row.
    pub fn slice(&self, start: usize, n: usize) -> TrellisResult<Row> {
        self.0
            .get(start..start + n)
            .map(|cells| Row(cells.to_vec()))
            .ok_or_else(|| {
                TrellisError::serialization(format!(
                    "row has {} columns, wanted {}..{}",
                    self.0.len(),
                    start,
                    start + n
                ))
            })
    }
}

fn unexpected(idx: usize, wanted: &str, got: &SqlValue) -> TrellisError {
    TrellisError::serialization(format!(
        "column {}: expected {}, found {:?}",
        idx,
        wanted,
        got.data_type()
    ))
}

/// Statement execution against the property store.
pub trait Access {
    /// Run a statement that returns rows.
    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<Vec<Row>>;

    /// Run a statement for its side effects; returns the affected row count.
    fn execute_sql(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<usize>;

    /// First row of a query, if any.
    fn query_first(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<Option<Row>> {
        Ok(self.query_rows(sql, params)?.into_iter().next())
    }
}

impl Access for Connection {
    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<Vec<Row>> {
        let mut stmt = self.prepare_cached(sql).map_store_err()?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(Row)
            })
            .map_store_err()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_store_err()?;
        Ok(rows)
    }

    fn execute_sql(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<usize> {
        let mut stmt = self.prepare_cached(sql).map_store_err()?;
        stmt.execute(rusqlite::params_from_iter(params.iter()))
            .map_store_err()
    }
}
