//! Error types shared by every Trellis crate.
//!
//! Errors fall into a small taxonomy that callers can branch on:
//!
//! - [`TrellisError::InvalidInput`]: rejected before any store access
//! - [`TrellisError::NotFound`]: a referenced node, edge or savepoint is absent
//! - [`TrellisError::Constraint`]: store-reported referential/uniqueness violation
//! - [`TrellisError::TransactionFinalized`]: operation on a committed/rolled-back transaction
//! - [`TrellisError::Contention`]: the store stayed busy/locked after all retries
//! - [`TrellisError::Storage`] / [`TrellisError::Serialization`]: everything else

use std::fmt;
use thiserror::Error;

/// Result alias used across the workspace.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// What kind of entity a [`TrellisError::NotFound`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// A node, by id.
    Node(i64),
    /// An edge, by id.
    Edge(i64),
    /// A savepoint, by name.
    Savepoint(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Node(id) => write!(f, "node {}", id),
            EntityRef::Edge(id) => write!(f, "edge {}", id),
            EntityRef::Savepoint(name) => write!(f, "savepoint '{}'", name),
        }
    }
}

/// Final state of a transaction that can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalState {
    /// The transaction was committed.
    Committed,
    /// The transaction was rolled back.
    RolledBack,
}

impl fmt::Display for FinalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalState::Committed => f.write_str("committed"),
            FinalState::RolledBack => f.write_str("rolled back"),
        }
    }
}

/// Unified error type.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// Malformed input: bad type name, zero limit, inverted depth bounds, ...
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong.
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("not found: {entity_ref}")]
    NotFound {
        /// The missing entity.
        entity_ref: EntityRef,
    },

    /// The store rejected a write because it violates a constraint.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Store-provided description.
        message: String,
    },

    /// The transaction was already finalized.
    #[error("transaction already {state}")]
    TransactionFinalized {
        /// How it was finalized.
        state: FinalState,
    },

    /// The store reported busy/locked and retries were exhausted.
    #[error("store contention after {attempts} attempt(s): {message}")]
    Contention {
        /// Attempts made before giving up (1 when reported without retrying).
        attempts: u32,
        /// Store-provided description of the last failure.
        message: String,
    },

    /// Any other storage failure.
    #[error("storage error: {message}")]
    Storage {
        /// Description.
        message: String,
        /// Underlying cause, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Property maps or rows failed to (de)serialize.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description.
        message: String,
    },
}

impl TrellisError {
    /// Build an [`TrellisError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TrellisError::InvalidInput {
            message: message.into(),
        }
    }

    /// Build a [`TrellisError::NotFound`].
    pub fn not_found(entity_ref: EntityRef) -> Self {
        TrellisError::NotFound { entity_ref }
    }

    /// Missing node shorthand.
    pub fn node_not_found(id: i64) -> Self {
        Self::not_found(EntityRef::Node(id))
    }

    /// Build a [`TrellisError::Constraint`].
    pub fn constraint(message: impl Into<String>) -> Self {
        TrellisError::Constraint {
            message: message.into(),
        }
    }

    /// Build a [`TrellisError::TransactionFinalized`].
    pub fn finalized(state: FinalState) -> Self {
        TrellisError::TransactionFinalized { state }
    }

    /// Build a single-attempt [`TrellisError::Contention`].
    pub fn contention(message: impl Into<String>) -> Self {
        TrellisError::Contention {
            attempts: 1,
            message: message.into(),
        }
    }

    /// Build a [`TrellisError::Storage`] without a source.
    pub fn storage(message: impl Into<String>) -> Self {
        TrellisError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`TrellisError::Storage`] carrying its cause.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TrellisError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a [`TrellisError::Serialization`].
    pub fn serialization(message: impl Into<String>) -> Self {
        TrellisError::Serialization {
            message: message.into(),
        }
    }

    /// Whether the write serializer may retry the failed unit of work.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrellisError::Contention { .. })
    }

    /// Whether this is a validation failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TrellisError::InvalidInput { .. })
    }

    /// Whether this is a not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrellisError::NotFound { .. })
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        TrellisError::serialization(err.to_string())
    }
}
