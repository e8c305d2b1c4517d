//! Multi-slot pattern matching.

use crate::test_utils::*;
use trellis::{props, Comparison, Direction, Graph, NodeId, SortOrder, Value};

/// People work at companies located in cities.
fn org_chart() -> (Graph, Vec<NodeId>) {
    let graph = setup();
    let node = |t: &str, name: &str| graph.create_node(t, props! { "name" => name }).unwrap().id;
    let ann = node("Person", "ann");
    let bea = node("Person", "bea");
    let cal = node("Person", "cal");
    let acme = node("Company", "acme");
    let globex = node("Company", "globex");
    let oslo = node("City", "oslo");
    let rome = node("City", "rome");
    for (p, c) in [(ann, acme), (bea, acme), (cal, globex)] {
        graph.create_edge("WORKS_AT", p, c, None).unwrap();
    }
    graph.create_edge("LOCATED_IN", acme, oslo, None).unwrap();
    graph.create_edge("LOCATED_IN", globex, rome, None).unwrap();
    (graph, vec![ann, bea, cal, acme, globex, oslo, rome])
}

#[test]
fn three_slot_chain() {
    let (graph, ids) = org_chart();
    let rows = graph
        .pattern()
        .start("p", "Person")
        .through("WORKS_AT", Direction::Outgoing)
        .end("c", "Company")
        .through("LOCATED_IN", Direction::Outgoing)
        .end("city", "City")
        .where_eq("city", "name", "oslo")
        .order_by("p", "name", SortOrder::Asc)
        .execute()
        .unwrap();
    let people: Vec<_> = rows.iter().map(|r| r.get("p").unwrap().id).collect();
    assert_eq!(people, vec![ids[0], ids[1]]);
    assert!(rows.iter().all(|r| r.get("city").unwrap().id == ids[5]));
    assert_eq!(rows[0].bindings().len(), 3);
}

#[test]
fn incoming_direction_and_projection() {
    let (graph, ids) = org_chart();
    let staff = graph
        .pattern()
        .start("c", "Company")
        .through("WORKS_AT", Direction::Incoming)
        .end("p", "Person")
        .where_eq("c", "name", "acme")
        .select(["p"])
        .execute()
        .unwrap();
    let names: Vec<_> = staff
        .iter()
        .map(|r| r.get("p").unwrap().get("name").cloned())
        .collect();
    assert_eq!(names, vec![Some(Value::from("ann")), Some(Value::from("bea"))]);
    assert!(staff[0].get("c").is_none());

    let cities = graph
        .pattern()
        .start("p", "Person")
        .through("WORKS_AT", Direction::Outgoing)
        .end("c", "Company")
        .through("LOCATED_IN", Direction::Outgoing)
        .end("city", "City")
        .select(["city"])
        .distinct();
    assert_eq!(cities.count().unwrap(), 2);
    let first = cities.first().unwrap().unwrap();
    assert_eq!(first.get("city").unwrap().id, ids[5]);
}

#[test]
fn conditions_support_every_operator() {
    let graph = setup();
    let hub = graph.create_node("Hub", props! {}).unwrap();
    for score in [1, 5, 9] {
        let leaf = graph.create_node("Leaf", props! { "score" => score }).unwrap();
        graph.create_edge("HAS", hub.id, leaf.id, None).unwrap();
    }
    let count = |cmp: Comparison| {
        graph
            .pattern()
            .start("h", "Hub")
            .through("HAS", Direction::Outgoing)
            .end("l", "Leaf")
            .filter("l", "score", cmp)
            .count()
            .unwrap()
    };
    assert_eq!(count(Comparison::eq(5)), 1);
    assert_eq!(count(Comparison::ne(5)), 2);
    assert_eq!(count(Comparison::gt(1)), 2);
    assert_eq!(count(Comparison::gte(1)), 3);
    assert_eq!(count(Comparison::lt(9)), 2);
    assert_eq!(count(Comparison::lte(0)), 0);
    assert_eq!(count(Comparison::one_of([1, 9])), 2);
}

#[test]
fn malformed_patterns_fail_validation() {
    let (graph, _) = org_chart();
    let cyclic = graph
        .pattern()
        .start("a", "Person")
        .through("WORKS_AT", Direction::Outgoing)
        .end("a", "Company");
    assert!(cyclic.execute().unwrap_err().is_invalid_input());

    let dangling = graph
        .pattern()
        .start("a", "Person")
        .through("WORKS_AT", Direction::Outgoing);
    assert!(dangling.exists().unwrap_err().is_invalid_input());

    let unknown = graph.pattern().start("a", "Person").where_eq("b", "name", "x");
    assert!(unknown.count().unwrap_err().is_invalid_input());

    let malformed = graph.pattern().start("not-ok", "Person");
    assert!(malformed.first().unwrap_err().is_invalid_input());
}

#[test]
fn pagination() {
    let (graph, ids) = org_chart();
    let page = graph
        .pattern()
        .start("p", "Person")
        .through("WORKS_AT", Direction::Outgoing)
        .end("c", "Company")
        .order_by("p", "id", SortOrder::Desc)
        .limit(1)
        .offset(1)
        .execute()
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].get("p").unwrap().id, ids[1]);
}
