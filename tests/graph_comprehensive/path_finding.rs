//! Shortest path and simple-path enumeration.

use crate::test_utils::*;
use proptest::prelude::*;
use trellis::{props, Direction, Graph, HopSpec, NodeId, Path, PathOptions};

/// A→B, B→C, A→C
fn triangle() -> (Graph, [NodeId; 3]) {
    let graph = setup();
    let a = graph.create_node("N", props! { "name" => "A" }).unwrap().id;
    let b = graph.create_node("N", props! { "name" => "B" }).unwrap().id;
    let c = graph.create_node("N", props! { "name" => "C" }).unwrap().id;
    graph.create_edge("E", a, b, None).unwrap();
    graph.create_edge("E", b, c, None).unwrap();
    graph.create_edge("E", a, c, None).unwrap();
    (graph, [a, b, c])
}

#[test]
fn shortest_path_takes_direct_edge() {
    let (graph, [a, _, c]) = triangle();
    let path = graph.traverse(a).outgoing("E").shortest_path(c).unwrap().unwrap();
    assert_eq!(path.node_ids(), vec![a, c]);
    assert_eq!(path.edges.len(), 1);
}

#[test]
fn all_paths_lists_both_routes_shortest_first() {
    let (graph, [a, b, c]) = triangle();
    let paths = graph.traverse(a).outgoing("E").all_paths(c, 10).unwrap();
    let got: Vec<_> = paths.iter().map(Path::node_ids).collect();
    assert_eq!(got, vec![vec![a, c], vec![a, b, c]]);
}

#[test]
fn unreachable_target() {
    let (graph, [a, _, c]) = triangle();
    assert!(graph.traverse(c).outgoing("E").shortest_path(a).unwrap().is_none());
    assert!(graph.traverse(c).outgoing("E").all_paths(a, 5).unwrap().is_empty());
}

#[test]
fn enumeration_respects_bounds() {
    let (graph, [a, _, c]) = triangle();
    let t = graph.traverse(a).outgoing("E");
    assert_eq!(t.all_paths(c, 1).unwrap().len(), 1);
    assert_eq!(t.paths(c, PathOptions::default().max_depth(1)).unwrap().len(), 1);
    assert!(t.all_paths(c, 0).unwrap_err().is_invalid_input());
}

#[test]
fn staged_hops_reach_a_node_seen_at_an_earlier_depth() {
    // A-X->B, A-X->C, C-Y->B, B-Z->T: B is first reached under X, where
    // only Y leads on, but T needs B expanded under Z.
    let graph = setup();
    let [a, b, c, t] = ["A", "B", "C", "T"]
        .map(|name| graph.create_node("N", props! { "name" => name }).unwrap().id);
    graph.create_edge("X", a, b, None).unwrap();
    graph.create_edge("X", a, c, None).unwrap();
    graph.create_edge("Y", c, b, None).unwrap();
    graph.create_edge("Z", b, t, None).unwrap();

    let staged = || graph.traverse(a).outgoing("X").outgoing("Y").outgoing("Z");
    let shortest = staged().shortest_path(t).unwrap().unwrap();
    let all = staged().all_paths(t, 10).unwrap();
    assert_eq!(shortest.node_ids(), vec![a, c, b, t]);
    assert_eq!(all.iter().map(Path::node_ids).collect::<Vec<_>>(), vec![vec![a, c, b, t]]);

    let reached = ids_of(&staged().max_depth(3).to_vec().unwrap());
    assert_eq!(reached, vec![b, c, t]);
}

#[test]
fn unreachable_target_in_a_clique_returns_quickly() {
    let graph = setup();
    let ids: Vec<NodeId> = (0..9).map(|_| graph.create_node("N", props! {}).unwrap().id).collect();
    for &f in &ids {
        for &t in &ids {
            if f != t {
                graph.create_edge("E", f, t, None).unwrap();
            }
        }
    }
    let island = graph.create_node("N", props! {}).unwrap().id;
    let walk = graph.traverse(ids[0]).both("E");
    assert!(walk.all_paths(island, 10_000).unwrap().is_empty());
    assert!(walk.shortest_path(island).unwrap().is_none());
}

/// Node count plus typed edge list over indexes.
fn small_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, &'static str)>)> {
    (2usize..7).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n, prop::sample::select(vec!["X", "Y"])), 0..14),
        )
    })
}

/// One to three hop specs over the same two edge types.
fn hop_sequence() -> impl Strategy<Value = Vec<HopSpec>> {
    let direction = prop::sample::select(vec![Direction::Outgoing, Direction::Incoming, Direction::Both]);
    let hop = (direction, prop::sample::select(vec!["X", "Y"]))
        .prop_map(|(d, t)| HopSpec::new(d).edge_type(t));
    prop::collection::vec(hop, 1..4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn shortest_path_is_never_longer_than_any_path(
        (n, edges) in small_graph(),
        hops in hop_sequence(),
        from in 0usize..7,
        to in 0usize..7,
    ) {
        let graph = Graph::in_memory().unwrap();
        let ids: Vec<NodeId> = (0..n)
            .map(|_| graph.create_node("N", props! {}).unwrap().id)
            .collect();
        for (f, t, ty) in &edges {
            graph.create_edge(*ty, ids[*f], ids[*t], None).unwrap();
        }
        let (s, t) = (ids[from % n], ids[to % n]);

        let walk = || hops.iter().cloned().fold(graph.traverse(s), |w, hop| w.hop(hop));
        let shortest = walk().shortest_path(t).unwrap();
        let all = walk().all_paths(t, 10_000).unwrap();

        prop_assert_eq!(shortest.is_some(), !all.is_empty());
        if let Some(p) = &shortest {
            prop_assert!(p.is_simple());
            prop_assert!(all.iter().all(|q| p.len() <= q.len() && q.is_simple()));
            prop_assert_eq!(p.len(), all[0].len());
        }
        prop_assert!(all.windows(2).all(|w| w[0].len() <= w[1].len()));

        // Anything a path reaches, unique reachability reports.
        if s != t && shortest.is_some() {
            let reached = walk().max_depth(n).to_vec().unwrap();
            prop_assert!(reached.iter().any(|node| node.id == t));
        }
    }
}
