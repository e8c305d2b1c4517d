//! Graph engine for Trellis
//!
//! This crate layers the graph model over the SQLite store:
//! - [`Database`]: store + write serializer + retry policy
//! - [`Transaction`]: explicit unit of work with savepoints
//! - [`Graph`]: node/edge CRUD facade over a shared [`Database`]
//! - [`Query`], [`Traversal`], [`Pattern`]: fluent readers that compile to SQL
//!
//! All readers run against anything implementing
//! [`trellis_storage::Access`], so the same builder works on a graph handle
//! or inside an open transaction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod graph;

pub use config::{AccessMode, GraphConfig};
pub use database::{Database, Transaction};
pub use graph::filter::{Comparison, Condition};
pub use graph::paths::{PathOptions, DEFAULT_MAX_PATHS};
pub use graph::pattern::{Pattern, PatternPlan, PatternRow};
pub use graph::query::{CompiledQuery, Join, NodePredicate, OrderField, Query, QueryPlan};
pub use graph::traversal::{HopSpec, Traversal, TraversalSpec};
pub use graph::Graph;
