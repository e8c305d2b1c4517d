//! Shared fixtures for the comprehensive suite.

use std::sync::Once;

use trellis::{props, Graph, NodeId};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fresh in-memory graph.
pub fn setup() -> Graph {
    init_tracing();
    Graph::in_memory().unwrap()
}

/// Named people plus KNOWS edges, returned in name order.
///
/// ```text
/// alice -> bob -> carol -> dave
///   \______________^
/// ```
pub fn social_graph() -> (Graph, Vec<NodeId>) {
    let graph = setup();
    let ids: Vec<NodeId> = [("alice", 30), ("bob", 25), ("carol", 35), ("dave", 41)]
        .iter()
        .map(|(name, age)| {
            graph
                .create_node("Person", props! { "name" => *name, "age" => *age })
                .unwrap()
                .id
        })
        .collect();
    for (from, to) in [(0, 1), (1, 2), (2, 3), (0, 2)] {
        graph.create_edge("KNOWS", ids[from], ids[to], None).unwrap();
    }
    (graph, ids)
}

/// Node ids of a result set, in order.
pub fn ids_of(nodes: &[trellis::Node]) -> Vec<NodeId> {
    nodes.iter().map(|n| n.id).collect()
}
