//! Traversal semantics over the social fixture:
//!
//! ```text
//! alice -e1-> bob -e2-> carol -e3-> dave
//! alice ---------e4---------^
//! ```

use crate::test_utils::*;
use trellis::{props, Direction, HopSpec, Path, Value};

#[test]
fn zero_depth_traverses_nothing() {
    let (graph, ids) = social_graph();
    let reached = graph.traverse(ids[0]).outgoing("KNOWS").max_depth(0).to_vec().unwrap();
    assert!(reached.is_empty());
    assert!(graph.traverse(ids[0]).max_depth(0).to_paths().unwrap().is_empty());
}

#[test]
fn single_hop_defaults() {
    let (graph, ids) = social_graph();
    let reached = graph.traverse(ids[0]).outgoing("KNOWS").to_vec().unwrap();
    assert_eq!(ids_of(&reached), vec![ids[1], ids[2]]);
}

#[test]
fn breadth_first_with_uniqueness() {
    let (graph, ids) = social_graph();
    let t = graph.traverse(ids[0]).outgoing("KNOWS").max_depth(2);
    assert_eq!(ids_of(&t.to_vec().unwrap()), vec![ids[1], ids[2], ids[3]]);

    let walks = t.clone().unique(false).to_vec().unwrap();
    assert_eq!(ids_of(&walks), vec![ids[1], ids[2], ids[2], ids[3]]);
}

#[test]
fn depth_window() {
    let (graph, ids) = social_graph();
    let second = graph
        .traverse(ids[0])
        .outgoing("KNOWS")
        .min_depth(2)
        .max_depth(2)
        .to_vec()
        .unwrap();
    assert_eq!(ids_of(&second), vec![ids[3]]);

    let with_start = graph.traverse(ids[0]).outgoing("KNOWS").min_depth(0).to_vec().unwrap();
    assert_eq!(ids_of(&with_start), vec![ids[0], ids[1], ids[2]]);

    let err = graph.traverse(ids[0]).min_depth(3).max_depth(1).to_vec().unwrap_err();
    assert!(err.is_invalid_input());
}

#[test]
fn incoming_and_both_directions() {
    let (graph, ids) = social_graph();
    let up = graph.traverse(ids[3]).incoming("KNOWS").max_depth(3).to_vec().unwrap();
    assert_eq!(ids_of(&up), vec![ids[2], ids[1], ids[0]]);

    let around = graph.traverse(ids[2]).both("KNOWS").to_vec().unwrap();
    assert_eq!(ids_of(&around), vec![ids[1], ids[3], ids[0]]);
}

#[test]
fn hop_sequence_applies_per_level() {
    let (graph, ids) = social_graph();
    // bob -> carol, then who else points at carol.
    let reached = graph
        .traverse(ids[1])
        .outgoing("KNOWS")
        .incoming("KNOWS")
        .to_vec()
        .unwrap();
    assert_eq!(ids_of(&reached), vec![ids[2], ids[0]]);
}

#[test]
fn node_type_restricts_hops() {
    let (graph, ids) = social_graph();
    let acme = graph.create_node("Company", props! { "name" => "Acme" }).unwrap();
    graph.create_edge("WORKS_AT", ids[1], acme.id, None).unwrap();

    let employers = graph
        .traverse(ids[1])
        .hop(HopSpec::new(Direction::Outgoing))
        .of_type("Company")
        .to_vec()
        .unwrap();
    assert_eq!(ids_of(&employers), vec![acme.id]);

    let any = graph.traverse(ids[1]).to_vec().unwrap();
    assert_eq!(ids_of(&any), vec![ids[2], acme.id]);
}

#[test]
fn predicates_filter_output_not_expansion() {
    let (graph, ids) = social_graph();
    let reached = graph
        .traverse(ids[0])
        .outgoing("KNOWS")
        .max_depth(2)
        .filter(|n| n.get("name") != Some(&Value::from("bob")))
        .to_vec()
        .unwrap();
    assert_eq!(ids_of(&reached), vec![ids[2], ids[3]]);
}

#[test]
fn paths_follow_walks() {
    let (graph, ids) = social_graph();
    let paths = graph.traverse(ids[0]).outgoing("KNOWS").max_depth(2).to_paths().unwrap();
    let got: Vec<_> = paths.iter().map(Path::node_ids).collect();
    assert_eq!(
        got,
        vec![
            vec![ids[0], ids[1]],
            vec![ids[0], ids[2]],
            vec![ids[0], ids[1], ids[2]],
            vec![ids[0], ids[2], ids[3]],
        ]
    );
    assert!(paths.iter().all(|p| p.edges.len() + 1 == p.nodes.len()));
}

#[test]
fn missing_start_is_not_found() {
    let graph = setup();
    assert!(graph.traverse(77).to_vec().unwrap_err().is_not_found());
}
