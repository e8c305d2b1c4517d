//! Trellis: an embedded property graph over SQLite.
//!
//! ```no_run
//! use trellis::{props, Graph, GraphConfig};
//!
//! # fn main() -> trellis::TrellisResult<()> {
//! let graph = Graph::open(GraphConfig::file("social.db"))?;
//! let alice = graph.create_node("Person", props! { "name" => "Alice" })?;
//! let bob = graph.create_node("Person", props! { "name" => "Bob" })?;
//! graph.create_edge("KNOWS", alice.id, bob.id, None)?;
//!
//! let friends = graph.traverse(alice.id).outgoing("KNOWS").to_vec()?;
//! assert_eq!(friends.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! [`Graph`] is the entry point. Writes outside an explicit
//! [`Graph::transaction`] commit individually; inside one, every
//! builder sees the transaction's uncommitted work.

#![warn(missing_docs)]

pub mod types;

pub use types::*;

pub use trellis_core::props;
pub use trellis_engine::{Database, Graph, Pattern, Query, Transaction, Traversal};
