//! Core graph entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{PropertyMap, Value};

/// Store-assigned node identifier (always positive).
pub type NodeId = i64;

/// Store-assigned edge identifier (always positive).
pub type EdgeId = i64;

/// A typed node with its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, immutable once assigned.
    pub id: NodeId,
    /// Node type label.
    pub node_type: String,
    /// Arbitrary properties.
    pub properties: PropertyMap,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last property merge; never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Identifier.
    pub id: EdgeId,
    /// Edge type label.
    pub edge_type: String,
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Optional properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// The endpoint opposite `node`, if `node` is one of the endpoints.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Direction for traversal and connectivity filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow outgoing edges (from → to).
    Outgoing,
    /// Follow incoming edges (to → from).
    Incoming,
    /// Follow edges in both directions.
    Both,
}

impl Direction {
    /// The direction seen from the other endpoint.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// An ordered walk through the graph.
///
/// `edges[i]` connects `nodes[i]` and `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Visited nodes, start first.
    pub nodes: Vec<Node>,
    /// Traversed edges.
    pub edges: Vec<Edge>,
}

impl Path {
    /// Single-node path.
    pub fn from_start(start: Node) -> Self {
        Self {
            nodes: vec![start],
            edges: Vec::new(),
        }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when the path has no hops.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Node ids in order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// Last node.
    pub fn end(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// True if no node id repeats.
    pub fn is_simple(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.nodes.len());
        self.nodes.iter().all(|n| seen.insert(n.id))
    }

    /// True if `id` is on the path.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Extend by one hop, returning a new path.
    pub fn extended(&self, edge: Edge, node: Node) -> Self {
        let mut next = self.clone();
        next.edges.push(edge);
        next.nodes.push(node);
        next
    }
}

/// A neighbor entry returned by neighbor queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// The node on the other end.
    pub node: Node,
    /// The edge leading to it.
    pub edge: Edge,
}

/// Row counts for a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Number of nodes.
    pub nodes: u64,
    /// Number of edges.
    pub edges: u64,
}
