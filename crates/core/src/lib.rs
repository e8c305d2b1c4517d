//! Core types for the Trellis property graph.
//!
//! - [`Value`] / [`PropertyMap`]: the tagged property value union
//! - [`Node`], [`Edge`], [`Path`]: by-value graph entities
//! - [`TrellisError`] / [`TrellisResult`]: the shared error taxonomy

pub mod error;
pub mod types;
pub mod value;

pub use error::{EntityRef, FinalState, TrellisError, TrellisResult};
pub use types::{
    Direction, Edge, EdgeId, GraphStats, Neighbor, Node, NodeId, Path, SortOrder,
};
pub use value::{properties_from_json, properties_to_json, PropertyMap, Value};
