//! Node query builder semantics.

use crate::test_utils::*;
use trellis::{props, Comparison, Direction, Graph, NodeId, SortOrder, Value};

/// Eight tasks ranked 0..8; ranks 2, 5 and 7 are inactive.
fn task_board() -> (Graph, Vec<NodeId>) {
    let graph = setup();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let status = if matches!(i, 2 | 5 | 7) { "inactive" } else { "active" };
        let t = graph
            .create_node("Task", props! { "status" => status, "rank" => i })
            .unwrap();
        tasks.push(t.id);
    }
    (graph, tasks)
}

#[test]
fn where_eq_with_limit_returns_limit_rows() {
    let (graph, _) = task_board();
    let rows = graph
        .query("Task")
        .where_eq([("status", "active")])
        .limit(2)
        .execute()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|n| n.get("status") == Some(&Value::from("active"))));
    assert_eq!(
        graph.query("Task").where_eq([("status", "active")]).count().unwrap(),
        5
    );
}

#[test]
fn ordering_and_pagination() {
    let (graph, tasks) = task_board();
    let page = graph
        .query("Task")
        .order_by("rank", SortOrder::Desc)
        .offset(1)
        .limit(3)
        .execute()
        .unwrap();
    assert_eq!(ids_of(&page), vec![tasks[6], tasks[5], tasks[4]]);

    // Offset without limit is unbounded.
    let tail = graph.query("Task").order_by("id", SortOrder::Asc).offset(6).execute().unwrap();
    assert_eq!(ids_of(&tail), vec![tasks[6], tasks[7]]);
}

#[test]
fn terminals() {
    let (graph, tasks) = task_board();
    let q = graph.query("Task").order_by("rank", SortOrder::Asc);
    assert_eq!(q.first().unwrap().map(|n| n.id), Some(tasks[0]));
    assert!(q.exists().unwrap());
    assert_eq!(q.count().unwrap(), 8);

    let none = graph.query("Task").where_eq([("status", "missing")]);
    assert!(none.first().unwrap().is_none());
    assert!(!none.exists().unwrap());
    assert_eq!(graph.query("Nothing").count().unwrap(), 0);
}

#[test]
fn comparison_operators() {
    let (graph, tasks) = task_board();
    let gt = graph.query("Task").where_op("rank", Comparison::gt(5)).execute().unwrap();
    assert_eq!(ids_of(&gt), vec![tasks[6], tasks[7]]);

    let one_of = graph
        .query("Task")
        .where_op("rank", Comparison::one_of([1, 3]))
        .execute()
        .unwrap();
    assert_eq!(ids_of(&one_of), vec![tasks[1], tasks[3]]);

    let ne = graph
        .query("Task")
        .where_op("status", Comparison::ne("active"))
        .count()
        .unwrap();
    assert_eq!(ne, 3);

    // Ints and floats compare numerically.
    let lte = graph.query("Task").where_op("rank", Comparison::lte(1.5)).count().unwrap();
    assert_eq!(lte, 2);
}

#[test]
fn post_fetch_predicates_run_after_pagination() {
    let (graph, tasks) = task_board();
    let first_id = tasks[0];
    let rows = graph
        .query("Task")
        .where_eq([("status", "active")])
        .order_by("id", SortOrder::Asc)
        .limit(2)
        .filter(move |n| n.id != first_id)
        .execute()
        .unwrap();
    // The limit applied before the predicate dropped a row.
    assert_eq!(ids_of(&rows), vec![tasks[1]]);
}

#[test]
fn connected_to_both_deduplicates() {
    let graph = setup();
    let a = graph.create_node("Person", props! { "name" => "a" }).unwrap();
    let b = graph.create_node("Person", props! { "name" => "b" }).unwrap();
    let loner = graph.create_node("Person", props! { "name" => "c" }).unwrap();
    graph.create_edge("LIKES", a.id, b.id, None).unwrap();
    graph.create_edge("LIKES", b.id, a.id, None).unwrap();

    let linked = graph
        .query("Person")
        .connected_to("Person", "LIKES", Direction::Both)
        .execute()
        .unwrap();
    assert_eq!(ids_of(&linked), vec![a.id, b.id]);

    let unlinked = graph
        .query("Person")
        .not_connected_to("Person", "LIKES", Direction::Both)
        .execute()
        .unwrap();
    assert_eq!(ids_of(&unlinked), vec![loner.id]);
}

#[test]
fn connected_to_respects_direction_and_type() {
    let (graph, ids) = social_graph();
    let sources = graph
        .query("Person")
        .connected_to("Person", "KNOWS", Direction::Outgoing)
        .execute()
        .unwrap();
    assert_eq!(ids_of(&sources), vec![ids[0], ids[1], ids[2]]);

    let sinks = graph
        .query("Person")
        .not_connected_to("Person", "KNOWS", Direction::Outgoing)
        .execute()
        .unwrap();
    assert_eq!(ids_of(&sinks), vec![ids[3]]);
}

#[test]
fn invalid_queries_fail_before_execution() {
    let graph = setup();
    assert!(graph.query("").execute().unwrap_err().is_invalid_input());
    assert!(graph.query("Task").limit(0).execute().unwrap_err().is_invalid_input());
    assert!(graph
        .query("Task")
        .where_op("k", Comparison::gt(Value::Null))
        .count()
        .unwrap_err()
        .is_invalid_input());
    assert!(graph
        .query("Task")
        .connected_to("Task", "bad type", Direction::Both)
        .exists()
        .is_err());
}
