//! Property graph over the relational store.
//!
//! Nodes and edges live in the `nodes` and `edges` tables; properties are
//! JSON objects. [`Graph`] is the shared, thread-safe entry point: reads go
//! straight to the store and every write runs in its own transaction. Inside
//! [`Graph::transaction`] the same operations are available on the
//! [`Transaction`], where they see uncommitted work.

pub mod filter;
pub mod paths;
pub mod pattern;
pub mod query;
mod rows;
pub mod traversal;
pub mod validate;

use std::sync::Arc;

use tracing::debug;
use trellis_core::{
    properties_to_json, Direction, Edge, EdgeId, GraphStats, Neighbor, Node, NodeId, PropertyMap,
    TrellisError, TrellisResult,
};
use trellis_storage::schema::{EDGE_COLUMNS, NODE_COLUMNS};
use trellis_storage::{Access, SqlValue};

use crate::config::GraphConfig;
use crate::database::{Database, Transaction};
use pattern::Pattern;
use query::{Query, QueryPlan};
use rows::{edge_from_row, node_from_row, now_millis};
use traversal::{Traversal, TraversalSpec};
use validate::{validate_edge_type, validate_node_type};

/// Graph handle providing CRUD, queries, traversal and pattern matching.
#[derive(Clone, Debug)]
pub struct Graph {
    db: Arc<Database>,
}

impl Graph {
    /// Wrap an open database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open a database and wrap it.
    pub fn open(config: GraphConfig) -> TrellisResult<Self> {
        Ok(Self::new(Arc::new(Database::open(config)?)))
    }

    /// Private in-memory graph.
    pub fn in_memory() -> TrellisResult<Self> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    /// The underlying database.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn reader(&self) -> &dyn Access {
        self.db.store()
    }

    /// Run `work` in a transaction; see [`Database::transaction`].
    pub fn transaction<T, F>(&self, work: F) -> TrellisResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> TrellisResult<T>,
    {
        self.db.transaction(work)
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Create a node.
    pub fn create_node(&self, node_type: &str, properties: PropertyMap) -> TrellisResult<Node> {
        self.db.transaction(|t| t.create_node(node_type, properties.clone()))
    }

    /// Get a node, or `None`.
    pub fn get_node(&self, id: NodeId) -> TrellisResult<Option<Node>> {
        fetch_node(self.reader(), id)
    }

    /// Merge `properties` into a node; new values win. Refreshes
    /// `updated_at`.
    pub fn update_node(&self, id: NodeId, properties: PropertyMap) -> TrellisResult<Node> {
        self.db.transaction(|t| t.update_node(id, properties.clone()))
    }

    /// Replace a node's properties wholesale.
    pub fn replace_node_properties(
        &self,
        id: NodeId,
        properties: PropertyMap,
    ) -> TrellisResult<Node> {
        self.db
            .transaction(|t| t.replace_node_properties(id, properties.clone()))
    }

    /// Delete a node and every edge touching it. Returns whether it existed.
    pub fn delete_node(&self, id: NodeId) -> TrellisResult<bool> {
        self.db.transaction(|t| t.delete_node(id))
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Create an edge. Missing endpoints fail with a constraint error.
    pub fn create_edge(
        &self,
        edge_type: &str,
        from: NodeId,
        to: NodeId,
        properties: Option<PropertyMap>,
    ) -> TrellisResult<Edge> {
        self.db
            .transaction(|t| t.create_edge(edge_type, from, to, properties.clone()))
    }

    /// Get an edge, or `None`.
    pub fn get_edge(&self, id: EdgeId) -> TrellisResult<Option<Edge>> {
        fetch_edge(self.reader(), id)
    }

    /// Delete an edge. Returns whether it existed.
    pub fn delete_edge(&self, id: EdgeId) -> TrellisResult<bool> {
        self.db.transaction(|t| t.delete_edge(id))
    }

    /// Edges touching `node` in `direction`, by id.
    pub fn edges_of(&self, node: NodeId, direction: Direction) -> TrellisResult<Vec<Edge>> {
        fetch_edges_of(self.reader(), node, direction)
    }

    /// Adjacent nodes with the connecting edge.
    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
        edge_type: Option<&str>,
    ) -> TrellisResult<Vec<Neighbor>> {
        traversal::neighbors(self.reader(), node, direction, edge_type)
    }

    /// Number of edges touching `node` in `direction`.
    pub fn degree(&self, node: NodeId, direction: Direction) -> TrellisResult<u64> {
        traversal::degree(self.reader(), node, direction)
    }

    /// Node and edge counts.
    pub fn stats(&self) -> TrellisResult<GraphStats> {
        fetch_stats(self.reader())
    }

    // =========================================================================
    // Query surfaces
    // =========================================================================

    /// Start a node query.
    pub fn query(&self, node_type: impl Into<String>) -> Query<'_> {
        Query::new(self.reader(), QueryPlan::new(node_type))
    }

    /// Start a traversal at `start`.
    pub fn traverse(&self, start: NodeId) -> Traversal<'_> {
        Traversal::new(self.reader(), TraversalSpec::new(start))
    }

    /// Start a pattern.
    pub fn pattern(&self) -> Pattern<'_> {
        Pattern::new(self.reader())
    }
}

impl<'db> Transaction<'db> {
    /// Create a node.
    pub fn create_node(&self, node_type: &str, properties: PropertyMap) -> TrellisResult<Node> {
        validate_node_type(node_type)?;
        let now = SqlValue::Integer(now_millis());
        let sql = format!(
            "INSERT INTO nodes (type, properties, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {}",
            NODE_COLUMNS
        );
        let row = self
            .query_first(
                &sql,
                &[
                    SqlValue::Text(node_type.to_string()),
                    SqlValue::Text(properties_to_json(&properties)),
                    now.clone(),
                    now,
                ],
            )?
            .ok_or_else(|| TrellisError::storage("INSERT returned no row"))?;
        let node = node_from_row(&row)?;
        debug!(id = node.id, node_type, "node created");
        Ok(node)
    }

    /// Get a node, or `None`.
    pub fn get_node(&self, id: NodeId) -> TrellisResult<Option<Node>> {
        fetch_node(self, id)
    }

    /// Merge `properties` into a node; new values win.
    pub fn update_node(&self, id: NodeId, properties: PropertyMap) -> TrellisResult<Node> {
        let mut node = fetch_node(self, id)?.ok_or_else(|| TrellisError::node_not_found(id))?;
        node.properties.extend(properties);
        self.write_properties(id, &node.properties)
    }

    /// Replace a node's properties wholesale.
    pub fn replace_node_properties(
        &self,
        id: NodeId,
        properties: PropertyMap,
    ) -> TrellisResult<Node> {
        self.write_properties(id, &properties)
    }

    fn write_properties(&self, id: NodeId, properties: &PropertyMap) -> TrellisResult<Node> {
        // MAX keeps updated_at >= created_at even if the clock steps back.
        let sql = format!(
            "UPDATE nodes SET properties = ?, updated_at = MAX(created_at, ?) WHERE id = ? RETURNING {}",
            NODE_COLUMNS
        );
        let row = self
            .query_first(
                &sql,
                &[
                    SqlValue::Text(properties_to_json(properties)),
                    SqlValue::Integer(now_millis()),
                    SqlValue::Integer(id),
                ],
            )?
            .ok_or_else(|| TrellisError::node_not_found(id))?;
        node_from_row(&row)
    }

    /// Delete a node and, by cascade, its edges.
    pub fn delete_node(&self, id: NodeId) -> TrellisResult<bool> {
        let n = self.execute_sql("DELETE FROM nodes WHERE id = ?", &[SqlValue::Integer(id)])?;
        debug!(id, deleted = n > 0, "node delete");
        Ok(n > 0)
    }

    /// Create an edge.
    pub fn create_edge(
        &self,
        edge_type: &str,
        from: NodeId,
        to: NodeId,
        properties: Option<PropertyMap>,
    ) -> TrellisResult<Edge> {
        validate_edge_type(edge_type)?;
        let sql = format!(
            "INSERT INTO edges (type, from_id, to_id, properties, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {}",
            EDGE_COLUMNS
        );
        let props = properties
            .as_ref()
            .map_or(SqlValue::Null, |p| SqlValue::Text(properties_to_json(p)));
        let row = self
            .query_first(
                &sql,
                &[
                    SqlValue::Text(edge_type.to_string()),
                    SqlValue::Integer(from),
                    SqlValue::Integer(to),
                    props,
                    SqlValue::Integer(now_millis()),
                ],
            )?
            .ok_or_else(|| TrellisError::storage("INSERT returned no row"))?;
        let edge = edge_from_row(&row)?;
        debug!(id = edge.id, edge_type, from, to, "edge created");
        Ok(edge)
    }

    /// Get an edge, or `None`.
    pub fn get_edge(&self, id: EdgeId) -> TrellisResult<Option<Edge>> {
        fetch_edge(self, id)
    }

    /// Delete an edge.
    pub fn delete_edge(&self, id: EdgeId) -> TrellisResult<bool> {
        let n = self.execute_sql("DELETE FROM edges WHERE id = ?", &[SqlValue::Integer(id)])?;
        Ok(n > 0)
    }

    /// Edges touching `node` in `direction`.
    pub fn edges_of(&self, node: NodeId, direction: Direction) -> TrellisResult<Vec<Edge>> {
        fetch_edges_of(self, node, direction)
    }

    /// Adjacent nodes with the connecting edge.
    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
        edge_type: Option<&str>,
    ) -> TrellisResult<Vec<Neighbor>> {
        traversal::neighbors(self, node, direction, edge_type)
    }

    /// Node and edge counts, including uncommitted work.
    pub fn stats(&self) -> TrellisResult<GraphStats> {
        fetch_stats(self)
    }

    /// Start a node query that sees this transaction's writes.
    pub fn query(&self, node_type: impl Into<String>) -> Query<'_> {
        Query::new(self, QueryPlan::new(node_type))
    }

    /// Start a traversal that sees this transaction's writes.
    pub fn traverse(&self, start: NodeId) -> Traversal<'_> {
        Traversal::new(self, TraversalSpec::new(start))
    }

    /// Start a pattern that sees this transaction's writes.
    pub fn pattern(&self) -> Pattern<'_> {
        Pattern::new(self)
    }
}

pub(crate) fn fetch_node(access: &dyn Access, id: NodeId) -> TrellisResult<Option<Node>> {
    let sql = format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS);
    access
        .query_first(&sql, &[SqlValue::Integer(id)])?
        .map(|row| node_from_row(&row))
        .transpose()
}

fn fetch_edge(access: &dyn Access, id: EdgeId) -> TrellisResult<Option<Edge>> {
    let sql = format!("SELECT {} FROM edges WHERE id = ?", EDGE_COLUMNS);
    access
        .query_first(&sql, &[SqlValue::Integer(id)])?
        .map(|row| edge_from_row(&row))
        .transpose()
}

fn fetch_edges_of(access: &dyn Access, node: NodeId, direction: Direction) -> TrellisResult<Vec<Edge>> {
    let filter = match direction {
        Direction::Outgoing => "from_id = ?1",
        Direction::Incoming => "to_id = ?1",
        Direction::Both => "from_id = ?1 OR to_id = ?1",
    };
    let sql = format!("SELECT {} FROM edges WHERE {} ORDER BY id", EDGE_COLUMNS, filter);
    access
        .query_rows(&sql, &[SqlValue::Integer(node)])?
        .iter()
        .map(edge_from_row)
        .collect()
}

fn fetch_stats(access: &dyn Access) -> TrellisResult<GraphStats> {
    let row = access
        .query_first(
            "SELECT (SELECT COUNT(*) FROM nodes), (SELECT COUNT(*) FROM edges)",
            &[],
        )?
        .ok_or_else(|| TrellisError::storage("COUNT returned no row"))?;
    Ok(GraphStats {
        nodes: u64::try_from(row.i64(0)?).unwrap_or(0),
        edges: u64::try_from(row.i64(1)?).unwrap_or(0),
    })
}
