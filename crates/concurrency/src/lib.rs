//! Write admission and transaction lifecycle for Trellis.
//!
//! - `WriteSerializer`: per-handle FIFO queue admitting one writer at a time
//! - `RetryPolicy`: exponential backoff when the store reports busy/locked
//! - `TransactionContext`: finalize-once state and the savepoint stack

#![warn(missing_docs)]

pub mod retry;
pub mod serializer;
pub mod transaction;

pub use retry::RetryPolicy;
pub use serializer::{WritePermit, WriteSerializer};
pub use transaction::{TransactionContext, TxnState};
