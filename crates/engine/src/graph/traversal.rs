//! Multi-hop traversal: breadth-first expansion, neighbors, degree.
//!
//! Each BFS level is one batched statement over the whole frontier. Results
//! come back ordered by edge id and are regrouped by source node in frontier
//! order, so expansion order is deterministic: frontier position first, then
//! ascending edge id.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use trellis_core::{Direction, Edge, Neighbor, Node, NodeId, Path, TrellisError, TrellisResult};
use trellis_storage::{Access, SqlValue};

use super::fetch_node;
use super::query::NodePredicate;
use super::rows::{edge_columns, edge_from_row, node_columns, node_from_row, EDGE_WIDTH, NODE_WIDTH};
use super::validate::{validate_edge_type, validate_node_type};

/// Frontier ids bound per statement; larger frontiers are split.
const MAX_BATCH: usize = 500;

/// One hop: which edges to follow and which nodes to accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopSpec {
    /// Direction to follow.
    pub direction: Direction,
    /// Edge type, or any.
    pub edge_type: Option<String>,
    /// Required type of the node reached, or any.
    pub node_type: Option<String>,
}

impl HopSpec {
    /// Any edge in `direction`, any node type.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            edge_type: None,
            node_type: None,
        }
    }

    /// Restrict the edge type.
    pub fn edge_type(mut self, t: impl Into<String>) -> Self {
        self.edge_type = Some(t.into());
        self
    }

    /// Restrict the type of the node reached.
    pub fn node_type(mut self, t: impl Into<String>) -> Self {
        self.node_type = Some(t.into());
        self
    }

    fn validate(&self) -> TrellisResult<()> {
        if let Some(t) = &self.edge_type {
            validate_edge_type(t)?;
        }
        if let Some(t) = &self.node_type {
            validate_node_type(t)?;
        }
        Ok(())
    }
}

/// Owned description of a traversal.
#[derive(Clone)]
pub struct TraversalSpec {
    pub(crate) start: NodeId,
    pub(crate) hops: Vec<HopSpec>,
    pub(crate) unique: bool,
    pub(crate) min_depth: Option<usize>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) predicates: Vec<NodePredicate>,
}

impl fmt::Debug for TraversalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalSpec")
            .field("start", &self.start)
            .field("hops", &self.hops)
            .field("unique", &self.unique)
            .field("min_depth", &self.min_depth)
            .field("max_depth", &self.max_depth)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl TraversalSpec {
    /// Traverse from `start`: unique, depth 1 up to the hop count.
    pub fn new(start: NodeId) -> Self {
        Self {
            start,
            hops: Vec::new(),
            unique: true,
            min_depth: None,
            max_depth: None,
            predicates: Vec::new(),
        }
    }

    /// Hop used to expand from `depth` to `depth + 1`. The last hop repeats;
    /// with no hops, any outgoing edge is followed.
    pub(crate) fn hop_at(&self, depth: usize) -> HopSpec {
        match self.hops.get(self.hop_index(depth)) {
            Some(hop) => hop.clone(),
            None => HopSpec::new(Direction::Outgoing),
        }
    }

    /// Index of the hop spec applied at `depth`. Stops growing at the last
    /// hop, so `(node, hop_index)` pairs form a finite state space.
    pub(crate) fn hop_index(&self, depth: usize) -> usize {
        depth.min(self.hops.len().saturating_sub(1))
    }

    /// Shallowest reported depth; 1 unless set.
    pub fn effective_min_depth(&self) -> usize {
        self.min_depth.unwrap_or(1)
    }

    /// Depth bound for `to_vec`/`to_paths`.
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.unwrap_or_else(|| self.hops.len().max(1))
    }

    /// Check hop types.
    pub(crate) fn validate_hops(&self) -> TrellisResult<()> {
        self.hops.iter().try_for_each(HopSpec::validate)
    }

    /// Check hops and depth bounds. Only an explicit `min_depth` is checked
    /// against `max_depth`, so `max_depth(0)` alone is valid and empty.
    pub fn validate(&self) -> TrellisResult<()> {
        self.validate_hops()?;
        let max = self.effective_max_depth();
        match self.min_depth {
            Some(min) if min > max => Err(TrellisError::invalid_input(format!(
                "min_depth {} exceeds max_depth {}",
                min, max
            ))),
            _ => Ok(()),
        }
    }

    fn accepts(&self, node: &Node) -> bool {
        self.predicates.iter().all(|p| p(node))
    }
}

/// A [`TraversalSpec`] bound to something it can run against.
#[derive(Clone)]
pub struct Traversal<'a> {
    pub(crate) access: &'a dyn Access,
    pub(crate) spec: TraversalSpec,
}

impl fmt::Debug for Traversal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal").field("spec", &self.spec).finish()
    }
}

impl<'a> Traversal<'a> {
    /// Bind `spec` to `access`.
    pub fn new(access: &'a dyn Access, spec: TraversalSpec) -> Self {
        Self { access, spec }
    }

    /// The underlying spec.
    pub fn spec(&self) -> &TraversalSpec {
        &self.spec
    }

    /// Append a hop.
    pub fn hop(mut self, hop: HopSpec) -> Self {
        self.spec.hops.push(hop);
        self
    }

    /// Follow outgoing edges of `edge_type`.
    pub fn outgoing(self, edge_type: impl Into<String>) -> Self {
        self.hop(HopSpec::new(Direction::Outgoing).edge_type(edge_type))
    }

    /// Follow incoming edges of `edge_type`.
    pub fn incoming(self, edge_type: impl Into<String>) -> Self {
        self.hop(HopSpec::new(Direction::Incoming).edge_type(edge_type))
    }

    /// Follow edges of `edge_type` either way.
    pub fn both(self, edge_type: impl Into<String>) -> Self {
        self.hop(HopSpec::new(Direction::Both).edge_type(edge_type))
    }

    /// Restrict the node type reached by the last hop (adding an
    /// any-outgoing hop if there is none).
    pub fn of_type(mut self, node_type: impl Into<String>) -> Self {
        match self.spec.hops.last_mut() {
            Some(hop) => hop.node_type = Some(node_type.into()),
            None => self
                .spec
                .hops
                .push(HopSpec::new(Direction::Outgoing).node_type(node_type)),
        }
        self
    }

    /// Dedup by node id (default `true`). When off, a node is reported once
    /// per walk that reaches it.
    pub fn unique(mut self, unique: bool) -> Self {
        self.spec.unique = unique;
        self
    }

    /// Skip nodes closer than `depth` hops (default 1).
    pub fn min_depth(mut self, depth: usize) -> Self {
        self.spec.min_depth = Some(depth);
        self
    }

    /// Stop after `depth` hops.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.spec.max_depth = Some(depth);
        self
    }

    /// Post-fetch predicate on reached nodes (`to_vec`) or path ends
    /// (`to_paths`).
    pub fn filter<F>(mut self, pred: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.spec.predicates.push(Arc::new(pred));
        self
    }

    /// Nodes reached within `[min_depth, max_depth]`, in BFS order.
    pub fn to_vec(&self) -> TrellisResult<Vec<Node>> {
        let spec = &self.spec;
        spec.validate()?;
        let start = require_node(self.access, spec.start)?;
        let (min, max) = (spec.effective_min_depth(), spec.effective_max_depth());

        let mut out = Vec::new();
        if min == 0 && spec.accepts(&start) {
            out.push(start.clone());
        }

        // A node reached again under a different hop spec may still lead
        // somewhere new, so expansion is deduplicated per (node, hop index)
        // while each node is reported at most once.
        let mut visited = FxHashSet::default();
        let mut reported = FxHashSet::default();
        visited.insert((start.id, spec.hop_index(0)));
        reported.insert(start.id);
        let mut frontier = vec![start.id];
        for depth in 1..=max {
            if frontier.is_empty() {
                break;
            }
            let level = expand(self.access, &frontier, &spec.hop_at(depth - 1))?;
            let hop = spec.hop_index(depth);
            let mut next = Vec::new();
            for &src in &frontier {
                for (_, node) in level.edges_from(src) {
                    if spec.unique && !visited.insert((node.id, hop)) {
                        continue;
                    }
                    next.push(node.id);
                    if spec.unique && !reported.insert(node.id) {
                        continue;
                    }
                    if depth >= min && spec.accepts(node) {
                        out.push(node.clone());
                    }
                }
            }
            trace!(depth, reached = next.len(), "traversal level expanded");
            frontier = next;
        }
        Ok(out)
    }

    /// Every walk from the start to a node within `[min_depth, max_depth]`.
    /// With `unique`, walks never revisit a node.
    pub fn to_paths(&self) -> TrellisResult<Vec<Path>> {
        let spec = &self.spec;
        spec.validate()?;
        let start = require_node(self.access, spec.start)?;
        let (min, max) = (spec.effective_min_depth(), spec.effective_max_depth());

        let mut out = Vec::new();
        let mut frontier = vec![Path::from_start(start)];
        if min == 0 && spec.accepts(&frontier[0].nodes[0]) {
            out.push(frontier[0].clone());
        }

        for depth in 1..=max {
            if frontier.is_empty() {
                break;
            }
            let ends = distinct_ends(&frontier);
            let level = expand(self.access, &ends, &spec.hop_at(depth - 1))?;
            let mut next = Vec::new();
            for path in &frontier {
                let Some(end) = path.end() else { continue };
                for (edge, node) in level.edges_from(end.id) {
                    if spec.unique && path.contains(node.id) {
                        continue;
                    }
                    let extended = path.extended(edge.clone(), node.clone());
                    if depth >= min && spec.accepts(node) {
                        out.push(extended.clone());
                    }
                    next.push(extended);
                }
            }
            trace!(depth, walks = next.len(), "path level expanded");
            frontier = next;
        }
        Ok(out)
    }
}

pub(crate) fn require_node(access: &dyn Access, id: NodeId) -> TrellisResult<Node> {
    fetch_node(access, id)?.ok_or_else(|| TrellisError::node_not_found(id))
}

pub(crate) fn distinct_ends(paths: &[Path]) -> Vec<NodeId> {
    let mut seen = FxHashSet::default();
    paths
        .iter()
        .filter_map(|p| p.end().map(|n| n.id))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// One BFS level: for each source node, the `(edge, neighbor)` pairs in
/// ascending edge id order.
#[derive(Debug, Default)]
pub(crate) struct Level {
    by_source: FxHashMap<NodeId, Vec<(Edge, Node)>>,
}

impl Level {
    pub(crate) fn edges_from(&self, src: NodeId) -> &[(Edge, Node)] {
        self.by_source.get(&src).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Expand `frontier` by one hop.
pub(crate) fn expand(access: &dyn Access, frontier: &[NodeId], hop: &HopSpec) -> TrellisResult<Level> {
    let mut level = Level::default();
    let mut ids: Vec<NodeId> = Vec::with_capacity(frontier.len());
    let mut seen = FxHashSet::default();
    ids.extend(frontier.iter().copied().filter(|id| seen.insert(*id)));

    for chunk in ids.chunks(MAX_BATCH) {
        let mut params = Vec::new();
        let sql = expand_sql(hop, chunk, &mut params);
        for row in access.query_rows(&sql, &params)? {
            let src = row.i64(0)?;
            let edge = edge_from_row(&row.slice(1, EDGE_WIDTH)?)?;
            let node = node_from_row(&row.slice(1 + EDGE_WIDTH, NODE_WIDTH)?)?;
            level.by_source.entry(src).or_default().push((edge, node));
        }
    }
    Ok(level)
}

fn expand_sql(hop: &HopSpec, ids: &[NodeId], params: &mut Vec<SqlValue>) -> String {
    let body = match hop.direction {
        Direction::Outgoing => branch(hop, ids, "from_id", "to_id", "", params),
        Direction::Incoming => branch(hop, ids, "to_id", "from_id", "", params),
        Direction::Both => {
            let out = branch(hop, ids, "from_id", "to_id", "", params);
            // A self-loop already came back through the outgoing branch.
            let inc = branch(hop, ids, "to_id", "from_id", " AND e.from_id <> e.to_id", params);
            format!("{} UNION ALL {}", out, inc)
        }
    };
    format!("{} ORDER BY 2", body)
}

fn branch(
    hop: &HopSpec,
    ids: &[NodeId],
    src: &str,
    dst: &str,
    extra: &str,
    params: &mut Vec<SqlValue>,
) -> String {
    let placeholders = vec!["?"; ids.len()].join(", ");
    params.extend(ids.iter().map(|id| SqlValue::Integer(*id)));
    let mut sql = format!(
        "SELECT e.{src} AS src, {ecols}, {mcols} FROM edges e JOIN nodes m ON m.id = e.{dst} \
         WHERE e.{src} IN ({ph}){extra}",
        src = src,
        dst = dst,
        ecols = edge_columns("e"),
        mcols = node_columns("m"),
        ph = placeholders,
        extra = extra
    );
    if let Some(t) = &hop.edge_type {
        sql.push_str(" AND e.type = ?");
        params.push(SqlValue::Text(t.clone()));
    }
    if let Some(t) = &hop.node_type {
        sql.push_str(" AND m.type = ?");
        params.push(SqlValue::Text(t.clone()));
    }
    sql
}

/// Edges incident to `node` with the node on the other end, by edge id.
/// A self-loop is listed once even for [`Direction::Both`].
pub(crate) fn neighbors(
    access: &dyn Access,
    node: NodeId,
    direction: Direction,
    edge_type: Option<&str>,
) -> TrellisResult<Vec<Neighbor>> {
    let mut hop = HopSpec::new(direction);
    if let Some(t) = edge_type {
        validate_edge_type(t)?;
        hop = hop.edge_type(t);
    }
    require_node(access, node)?;
    let mut level = expand(access, &[node], &hop)?;
    Ok(level
        .by_source
        .remove(&node)
        .unwrap_or_default()
        .into_iter()
        .map(|(edge, node)| Neighbor { node, edge })
        .collect())
}

/// Number of edges incident to `node` in `direction`; a self-loop counts
/// once.
pub(crate) fn degree(access: &dyn Access, node: NodeId, direction: Direction) -> TrellisResult<u64> {
    require_node(access, node)?;
    let sql = match direction {
        Direction::Outgoing => "SELECT COUNT(*) FROM edges WHERE from_id = ?",
        Direction::Incoming => "SELECT COUNT(*) FROM edges WHERE to_id = ?",
        Direction::Both => "SELECT COUNT(*) FROM edges WHERE from_id = ?1 OR to_id = ?1",
    };
    let row = access
        .query_first(sql, &[SqlValue::Integer(node)])?
        .ok_or_else(|| TrellisError::storage("COUNT returned no row"))?;
    Ok(u64::try_from(row.i64(0)?).unwrap_or(0))
}
