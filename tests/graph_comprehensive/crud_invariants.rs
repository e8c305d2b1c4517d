//! Node and edge lifecycle invariants.

use crate::test_utils::*;
use trellis::{props, Direction, TrellisError, Value};

#[test]
fn created_node_round_trips() {
    let graph = setup();
    let n = graph
        .create_node(
            "Person",
            props! { "name" => "Ann", "tags" => vec!["a", "b"], "score" => 1.5 },
        )
        .unwrap();
    assert_eq!(n.created_at, n.updated_at);

    let fetched = graph.get_node(n.id).unwrap().unwrap();
    assert_eq!(fetched, n);
    assert_eq!(
        fetched.get("tags"),
        Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
    );
}

#[test]
fn update_merges_and_never_moves_updated_at_backwards() {
    let graph = setup();
    let n = graph
        .create_node("Person", props! { "name" => "Ann", "age" => 30 })
        .unwrap();
    let u = graph.update_node(n.id, props! { "age" => 31 }).unwrap();
    assert_eq!(u.get("name"), Some(&Value::from("Ann")));
    assert_eq!(u.get("age"), Some(&Value::Int(31)));
    assert!(u.updated_at >= n.updated_at);
    assert_eq!(u.created_at, n.created_at);

    let r = graph.replace_node_properties(n.id, props! { "x" => true }).unwrap();
    assert_eq!(r.properties.len(), 1);
}

#[test]
fn missing_node_operations() {
    let graph = setup();
    assert!(graph.get_node(404).unwrap().is_none());
    assert!(graph.update_node(404, props! {}).unwrap_err().is_not_found());
    assert!(!graph.delete_node(404).unwrap());
    assert!(!graph.delete_edge(404).unwrap());
}

#[test]
fn deleting_a_node_removes_its_edges() {
    let (graph, ids) = social_graph();
    assert!(graph.delete_node(ids[2]).unwrap());
    assert!(graph.edges_of(ids[2], Direction::Both).unwrap().is_empty());
    let stats = graph.stats().unwrap();
    assert_eq!(stats.nodes, 3);
    // Only alice -> bob survives.
    assert_eq!(stats.edges, 1);
}

#[test]
fn dangling_edge_is_a_constraint_error() {
    let graph = setup();
    let a = graph.create_node("Person", props! {}).unwrap();
    let err = graph.create_edge("KNOWS", a.id, 999, None).unwrap_err();
    assert!(matches!(err, TrellisError::Constraint { .. }));
    assert_eq!(graph.stats().unwrap().edges, 0);
}

#[test]
fn malformed_types_are_rejected() {
    let graph = setup();
    assert!(graph.create_node("", props! {}).unwrap_err().is_invalid_input());
    assert!(graph.create_node("has space", props! {}).unwrap_err().is_invalid_input());
    let a = graph.create_node("T", props! {}).unwrap();
    assert!(graph.create_edge("", a.id, a.id, None).unwrap_err().is_invalid_input());
}

#[test]
fn edges_and_neighbors_by_direction() {
    let (graph, ids) = social_graph();
    let out = graph.edges_of(ids[0], Direction::Outgoing).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.windows(2).all(|w| w[0].id < w[1].id));

    let incoming = graph.neighbors(ids[2], Direction::Incoming, Some("KNOWS")).unwrap();
    let from: Vec<_> = incoming.iter().map(|n| n.node.id).collect();
    assert_eq!(from, vec![ids[1], ids[0]]);

    assert_eq!(graph.degree(ids[2], Direction::Both).unwrap(), 3);
    assert!(graph.neighbors(ids[0], Direction::Outgoing, Some("LIKES")).unwrap().is_empty());
}

mod merge_properties {
    use super::*;
    use proptest::prelude::*;
    use trellis::PropertyMap;

    fn small_map() -> impl Strategy<Value = PropertyMap> {
        prop::collection::btree_map("[a-e]", any::<i64>().prop_map(Value::Int), 0..5)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn update_is_right_biased_union(base in small_map(), patch in small_map()) {
            let graph = trellis::Graph::in_memory().unwrap();
            let n = graph.create_node("T", base.clone()).unwrap();
            let merged = graph.update_node(n.id, patch.clone()).unwrap();

            let mut expected = base;
            expected.extend(patch);
            prop_assert_eq!(&merged.properties, &expected);
            prop_assert!(merged.updated_at >= merged.created_at);
            prop_assert_eq!(graph.get_node(n.id).unwrap().unwrap(), merged);
        }
    }
}
