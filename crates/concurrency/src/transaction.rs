//! Finalize-once transaction state with a savepoint stack.
//!
//! `TransactionContext` decides whether an operation is legal and how the
//! savepoint stack changes; the caller supplies the statement that performs
//! it. State only advances after the statement succeeds, so a failed
//! statement leaves the context where it was.

use trellis_core::{EntityRef, FinalState, TrellisError, TrellisResult};

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Open; operations allowed.
    Active,
    /// Committed; terminal.
    Committed,
    /// Rolled back; terminal.
    RolledBack,
}

/// State machine for one transaction.
#[derive(Debug)]
pub struct TransactionContext {
    state: TxnState,
    savepoints: Vec<String>,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext {
    /// A freshly begun transaction.
    pub fn new() -> Self {
        Self {
            state: TxnState::Active,
            savepoints: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> TxnState {
        self.state
    }

    /// True until commit or rollback.
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    /// Open savepoints, oldest first.
    pub fn savepoints(&self) -> &[String] {
        &self.savepoints
    }

    /// Fail with `TransactionFinalized` unless active.
    pub fn ensure_active(&self) -> TrellisResult<()> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Committed => Err(TrellisError::finalized(FinalState::Committed)),
            TxnState::RolledBack => Err(TrellisError::finalized(FinalState::RolledBack)),
        }
    }

    /// Commit via `issue`.
    pub fn commit(&mut self, issue: impl FnOnce() -> TrellisResult<()>) -> TrellisResult<()> {
        self.ensure_active()?;
        issue()?;
        self.finish(TxnState::Committed);
        Ok(())
    }

    /// Roll back via `issue`. The transaction counts as rolled back even if
    /// the statement fails: the store discards a transaction whose rollback
    /// errored.
    pub fn rollback(&mut self, issue: impl FnOnce() -> TrellisResult<()>) -> TrellisResult<()> {
        self.ensure_active()?;
        let result = issue();
        self.finish(TxnState::RolledBack);
        result
    }

    /// Push savepoint `name`. Names are unique within the transaction.
    pub fn savepoint(
        &mut self,
        name: &str,
        issue: impl FnOnce(&str) -> TrellisResult<()>,
    ) -> TrellisResult<()> {
        self.ensure_active()?;
        if self.savepoints.iter().any(|s| s == name) {
            return Err(TrellisError::invalid_input(format!(
                "savepoint '{}' already exists in this transaction",
                name
            )));
        }
        issue(name)?;
        self.savepoints.push(name.to_string());
        Ok(())
    }

    /// Undo work since `name`. Later savepoints are discarded; `name` stays
    /// open and can be rolled back to again.
    pub fn rollback_to(
        &mut self,
        name: &str,
        issue: impl FnOnce(&str) -> TrellisResult<()>,
    ) -> TrellisResult<()> {
        self.ensure_active()?;
        let idx = self.position(name)?;
        issue(name)?;
        self.savepoints.truncate(idx + 1);
        Ok(())
    }

    /// Merge work since `name` into the enclosing scope, discarding `name`
    /// and every later savepoint.
    pub fn release(
        &mut self,
        name: &str,
        issue: impl FnOnce(&str) -> TrellisResult<()>,
    ) -> TrellisResult<()> {
        self.ensure_active()?;
        let idx = self.position(name)?;
        issue(name)?;
        self.savepoints.truncate(idx);
        Ok(())
    }

    fn position(&self, name: &str) -> TrellisResult<usize> {
        self.savepoints
            .iter()
            .rposition(|s| s == name)
            .ok_or_else(|| TrellisError::not_found(EntityRef::Savepoint(name.to_string())))
    }

    fn finish(&mut self, state: TxnState) {
        self.state = state;
        self.savepoints.clear();
    }
}
