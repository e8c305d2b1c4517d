//! Path finding: shortest path and bounded simple-path enumeration.
//!
//! Both walk the graph level by level with the traversal's hop specs.
//! `shortest_path` searches over `(node, hop index)` states: a node seen
//! under one hop spec is still expanded when reached under another, and the
//! hop index stops growing at the last spec, so the search terminates on
//! cyclic graphs without a depth bound. Enumeration tracks visited nodes per
//! path instead, so two simple paths through the same intermediate node are
//! both found. It first runs the state search and returns nothing when the
//! target is unreachable, which keeps the no-path case linear in the size of
//! the graph.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use trellis_core::{Edge, Node, NodeId, Path, TrellisError, TrellisResult};

use super::traversal::{distinct_ends, expand, require_node, Traversal};

/// Default result cap for [`Traversal::all_paths`].
pub const DEFAULT_MAX_PATHS: usize = 10;

/// A node paired with the index of the hop spec that expands it.
type HopState = (NodeId, usize);

/// Bounds for path enumeration.
///
/// Without a depth bound, enumeration is only cheap when the target is
/// reachable and `max_paths` is small: the number of simple paths grows
/// factorially with graph density. An unreachable target is detected up
/// front and costs one breadth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOptions {
    /// Stop after this many paths. Must be positive.
    pub max_paths: usize,
    /// Longest path in hops. Falls back to the traversal's `max_depth`, and
    /// is unbounded if neither is set.
    pub max_depth: Option<usize>,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            max_depth: None,
        }
    }
}

impl PathOptions {
    /// Cap the number of paths.
    pub fn max_paths(mut self, n: usize) -> Self {
        self.max_paths = n;
        self
    }

    /// Cap the path length.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

impl Traversal<'_> {
    /// A minimum-hop simple path from the start to `target`, if one exists.
    ///
    /// Among equally short paths the first discovered wins: nodes earlier in
    /// the frontier expand first, and each node's edges expand in ascending
    /// id order.
    pub fn shortest_path(&self, target: NodeId) -> TrellisResult<Option<Path>> {
        let spec = &self.spec;
        spec.validate_hops()?;
        let start = require_node(self.access, spec.start)?;
        require_node(self.access, target)?;
        if start.id == target {
            return Ok(Some(Path::from_start(start)));
        }

        match self.shortest_walk(&start, target, spec.max_depth)? {
            None => {
                debug!(start = start.id, target, "no path");
                Ok(None)
            }
            Some(walk) if walk.is_simple() => {
                debug!(start = start.id, target, hops = walk.len(), "shortest path found");
                Ok(Some(walk))
            }
            Some(walk) => {
                // The shortest walk matching the hop specs revisits a node;
                // the first enumerated simple path is the shortest one.
                debug!(start = start.id, target, hops = walk.len(), "shortest walk is not simple");
                Ok(self.enumerate(start, target, 1, spec.max_depth)?.pop())
            }
        }
    }

    /// Simple paths from the start to `target`, shortest first, at most
    /// `opts.max_paths` of them.
    pub fn paths(&self, target: NodeId, opts: PathOptions) -> TrellisResult<Vec<Path>> {
        let spec = &self.spec;
        spec.validate_hops()?;
        if opts.max_paths == 0 {
            return Err(TrellisError::invalid_input("max_paths must be positive"));
        }
        let start = require_node(self.access, spec.start)?;
        require_node(self.access, target)?;
        if start.id == target {
            return Ok(vec![Path::from_start(start)]);
        }

        let max_depth = opts.max_depth.or(spec.max_depth);
        if self.shortest_walk(&start, target, max_depth)?.is_none() {
            debug!(start = start.id, target, "target unreachable, nothing to enumerate");
            return Ok(Vec::new());
        }
        self.enumerate(start, target, opts.max_paths, max_depth)
    }

    /// [`paths`](Self::paths) with only a result cap.
    pub fn all_paths(&self, target: NodeId, max_paths: usize) -> TrellisResult<Vec<Path>> {
        self.paths(target, PathOptions::default().max_paths(max_paths))
    }

    /// Breadth-first search over hop states. The returned walk is minimal in
    /// hops but may repeat a node.
    fn shortest_walk(
        &self,
        start: &Node,
        target: NodeId,
        max_depth: Option<usize>,
    ) -> TrellisResult<Option<Path>> {
        let spec = &self.spec;
        let mut parents: FxHashMap<HopState, (HopState, Edge, Node)> = FxHashMap::default();
        let mut visited = FxHashSet::default();
        visited.insert((start.id, spec.hop_index(0)));
        let mut frontier = vec![start.id];
        let mut depth = 0;

        while !frontier.is_empty() && max_depth.map_or(true, |m| depth < m) {
            let level = expand(self.access, &frontier, &spec.hop_at(depth))?;
            let (here, there) = (spec.hop_index(depth), spec.hop_index(depth + 1));
            let mut next = Vec::new();
            for &src in &frontier {
                for (edge, node) in level.edges_from(src) {
                    let state = (node.id, there);
                    if !visited.insert(state) {
                        continue;
                    }
                    parents.insert(state, ((src, here), edge.clone(), node.clone()));
                    if node.id == target {
                        return Ok(Some(rebuild(start.clone(), state, parents)));
                    }
                    next.push(node.id);
                }
            }
            frontier = next;
            depth += 1;
        }
        Ok(None)
    }

    /// Level-by-level simple-path enumeration.
    fn enumerate(
        &self,
        start: Node,
        target: NodeId,
        max_paths: usize,
        max_depth: Option<usize>,
    ) -> TrellisResult<Vec<Path>> {
        let spec = &self.spec;
        let mut out = Vec::new();
        let mut frontier = vec![Path::from_start(start)];
        let mut depth = 0;

        while !frontier.is_empty() && max_depth.map_or(true, |m| depth < m) {
            let ends = distinct_ends(&frontier);
            let level = expand(self.access, &ends, &spec.hop_at(depth))?;
            let mut next = Vec::new();
            for path in &frontier {
                let Some(end) = path.end() else { continue };
                for (edge, node) in level.edges_from(end.id) {
                    if path.contains(node.id) {
                        continue;
                    }
                    let extended = path.extended(edge.clone(), node.clone());
                    if node.id == target {
                        out.push(extended);
                        if out.len() >= max_paths {
                            return Ok(out);
                        }
                    } else {
                        next.push(extended);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }
        Ok(out)
    }
}

fn rebuild(
    start: Node,
    target: HopState,
    mut parents: FxHashMap<HopState, (HopState, Edge, Node)>,
) -> Path {
    let mut hops = Vec::new();
    let mut cur = target;
    while let Some((parent, edge, node)) = parents.remove(&cur) {
        hops.push((edge, node));
        cur = parent;
    }
    hops.reverse();
    hops.into_iter()
        .fold(Path::from_start(start), |mut path, (edge, node)| {
            path.edges.push(edge);
            path.nodes.push(node);
            path
        })
}
