//! Graph Comprehensive Test Suite
//!
//! End-to-end behavior of the public `trellis` API.
//!
//! ## Test Groups
//!
//! - **CRUD**: node/edge lifecycle, cascade, timestamps
//! - **Query**: filters, joins, ordering, pagination, post-fetch predicates
//! - **Traversal**: hop specs, depth bounds, uniqueness, paths
//! - **Paths**: shortest path and simple-path enumeration
//! - **Pattern**: multi-slot joins
//! - **Transactions**: lifecycle, savepoints, serialization, contention
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test graph_comprehensive
//! ```

mod test_utils;

mod crud_invariants;
mod query_semantics;
mod traversal_semantics;
mod path_finding;
mod pattern_matching;
mod transaction_lifecycle;
mod write_contention;
