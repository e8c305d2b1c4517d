//! Rehydration of raw rows into graph entities.

use chrono::{DateTime, TimeZone, Utc};
use trellis_core::{properties_from_json, Edge, Node, TrellisError, TrellisResult};
use trellis_storage::Row;

/// Column list for a node under table alias `alias`, in the order
/// [`node_from_row`] expects.
pub(crate) fn node_columns(alias: &str) -> String {
    format!(
        "{a}.id, {a}.type, {a}.properties, {a}.created_at, {a}.updated_at",
        a = alias
    )
}

/// Column list for an edge under table alias `alias`, in the order
/// [`edge_from_row`] expects.
pub(crate) fn edge_columns(alias: &str) -> String {
    format!(
        "{a}.id, {a}.type, {a}.from_id, {a}.to_id, {a}.properties, {a}.created_at",
        a = alias
    )
}

pub(crate) const NODE_WIDTH: usize = trellis_storage::schema::NODE_WIDTH;
pub(crate) const EDGE_WIDTH: usize = trellis_storage::schema::EDGE_WIDTH;

pub(crate) fn node_from_row(row: &Row) -> TrellisResult<Node> {
    Ok(Node {
        id: row.i64(0)?,
        node_type: row.text(1)?.to_string(),
        properties: properties_from_json(row.text(2)?)?,
        created_at: from_millis(row.i64(3)?)?,
        updated_at: from_millis(row.i64(4)?)?,
    })
}

pub(crate) fn edge_from_row(row: &Row) -> TrellisResult<Edge> {
    Ok(Edge {
        id: row.i64(0)?,
        edge_type: row.text(1)?.to_string(),
        from: row.i64(2)?,
        to: row.i64(3)?,
        properties: row.opt_text(4)?.map(properties_from_json).transpose()?,
        created_at: from_millis(row.i64(5)?)?,
    })
}

pub(crate) fn nodes_from_rows(rows: &[Row]) -> TrellisResult<Vec<Node>> {
    rows.iter().map(node_from_row).collect()
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(ms: i64) -> TrellisResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| TrellisError::serialization(format!("timestamp {} out of range", ms)))
}
