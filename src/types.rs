//! Public types for the Trellis API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// ============================================================================
// Graph entities
// ============================================================================

// Property values
pub use trellis_core::{PropertyMap, Value};

// Nodes, edges and traversal results
pub use trellis_core::{Edge, EdgeId, GraphStats, Neighbor, Node, NodeId, Path};

// Builder vocabulary
pub use trellis_core::{Direction, SortOrder};

// ============================================================================
// Errors
// ============================================================================

pub use trellis_core::{EntityRef, FinalState, TrellisError, TrellisResult};

// ============================================================================
// Configuration
// ============================================================================

pub use trellis_concurrency::RetryPolicy;
pub use trellis_engine::{AccessMode, GraphConfig};

// Transaction lifecycle
pub use trellis_concurrency::TxnState;

// ============================================================================
// Query vocabulary
// ============================================================================

pub use trellis_engine::{
    CompiledQuery, Comparison, Condition, HopSpec, OrderField, PathOptions, PatternPlan,
    PatternRow, QueryPlan, TraversalSpec, DEFAULT_MAX_PATHS,
};
