//! Database handle and transactions.
//!
//! Every mutation runs inside a [`Transaction`]. [`Database::transaction`] is
//! the driver: it waits for the handle's write permit, begins, runs the unit
//! of work, and commits on `Ok` or rolls back on `Err`. A unit of work that
//! hits a busy/locked store is rolled back and run again from the start, so
//! the closure must be safe to repeat.

use std::path::Path;

use parking_lot::ReentrantMutexGuard;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use trellis_concurrency::{TransactionContext, TxnState, WritePermit, WriteSerializer};
use trellis_core::{TrellisError, TrellisResult};
use trellis_storage::{txn, Access, Row, SqlValue, SqliteStore};

use crate::config::GraphConfig;

/// An open graph database.
///
/// Share it across threads behind an `Arc`; writers on one handle are
/// admitted one at a time in arrival order.
pub struct Database {
    store: SqliteStore,
    serializer: WriteSerializer,
    config: GraphConfig,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

impl Database {
    /// Open a database as described by `config`.
    pub fn open(config: GraphConfig) -> TrellisResult<Self> {
        let store = SqliteStore::open(&config.store_options())?;
        info!(
            path = ?config.path,
            access_mode = ?config.access_mode,
            max_attempts = config.retry.max_attempts,
            "database opened"
        );
        Ok(Self {
            store,
            serializer: WriteSerializer::new(),
            config,
        })
    }

    /// Open (creating if needed) a file-backed database with defaults.
    pub fn open_path(path: impl AsRef<Path>) -> TrellisResult<Self> {
        Self::open(GraphConfig::file(path))
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> TrellisResult<Self> {
        Self::open(GraphConfig::new())
    }

    /// Configuration this handle was opened with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// True if the handle rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.config.is_read_only()
    }

    /// Read path for statements outside any transaction.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Writers holding or queued for this handle's write permit.
    pub fn pending_writers(&self) -> u64 {
        self.serializer.pending()
    }

    fn ensure_writable(&self) -> TrellisResult<()> {
        if self.is_read_only() {
            return Err(TrellisError::invalid_input(
                "database is opened read-only; transactions are not allowed",
            ));
        }
        Ok(())
    }

    /// Run `work` in a transaction.
    ///
    /// Commits when `work` returns `Ok` and rolls back when it returns `Err`,
    /// unless `work` already committed or rolled back itself. Contention is
    /// retried per the configured [`RetryPolicy`](trellis_concurrency::RetryPolicy).
    /// Calling this again from inside `work` fails with `InvalidInput`; use
    /// savepoints for nested scopes.
    pub fn transaction<T, F>(&self, mut work: F) -> TrellisResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> TrellisResult<T>,
    {
        self.ensure_writable()?;
        let _permit = self.serializer.acquire()?;

        self.config.retry.run(|attempt| {
            let mut txn = Transaction::start(&self.store, None)?;
            debug!(attempt, "transaction started");
            match work(&mut txn) {
                Ok(value) => {
                    if txn.is_active() {
                        txn.commit()?;
                    }
                    Ok(value)
                }
                Err(e) => {
                    if txn.is_active() {
                        if let Err(rb) = txn.rollback() {
                            warn!(error = %rb, "rollback after failed unit of work also failed");
                        }
                        warn!(error = %e, "transaction rolled back");
                    }
                    Err(e)
                }
            }
        })
    }

    /// Begin a transaction that the caller finalizes explicitly.
    ///
    /// Holds the write permit until dropped; dropping it while still active
    /// rolls back. No contention retry is applied.
    pub fn begin(&self) -> TrellisResult<Transaction<'_>> {
        self.ensure_writable()?;
        let permit = self.serializer.acquire()?;
        Transaction::start(&self.store, Some(permit))
    }
}

/// An open write transaction.
///
/// Reads through a transaction see its own uncommitted writes.
pub struct Transaction<'db> {
    conn: ReentrantMutexGuard<'db, Connection>,
    ctx: TransactionContext,
    _permit: Option<WritePermit<'db>>,
}

impl<'db> Transaction<'db> {
    fn start(store: &'db SqliteStore, permit: Option<WritePermit<'db>>) -> TrellisResult<Self> {
        let conn = store.writer();
        txn::begin(&conn)?;
        Ok(Self {
            conn,
            ctx: TransactionContext::new(),
            _permit: permit,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TxnState {
        self.ctx.state()
    }

    /// True until committed or rolled back.
    pub fn is_active(&self) -> bool {
        self.ctx.is_active()
    }

    /// Open savepoints, oldest first.
    pub fn savepoints(&self) -> &[String] {
        self.ctx.savepoints()
    }

    pub(crate) fn ensure_active(&self) -> TrellisResult<()> {
        self.ctx.ensure_active()
    }

    /// Make all changes durable. Fails if already finalized.
    pub fn commit(&mut self) -> TrellisResult<()> {
        let conn = &self.conn;
        self.ctx.commit(|| txn::commit(conn))?;
        debug!("transaction committed");
        Ok(())
    }

    /// Discard all changes. Fails if already finalized.
    pub fn rollback(&mut self) -> TrellisResult<()> {
        let conn = &self.conn;
        self.ctx.rollback(|| txn::rollback(conn))?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Open a named checkpoint. Names must be unique within the transaction.
    pub fn savepoint(&mut self, name: &str) -> TrellisResult<()> {
        let conn = &self.conn;
        self.ctx.savepoint(name, |n| txn::savepoint(conn, n))
    }

    /// Discard work since `name`. The savepoint stays open; later ones are
    /// dropped.
    pub fn rollback_to(&mut self, name: &str) -> TrellisResult<()> {
        let conn = &self.conn;
        self.ctx.rollback_to(name, |n| txn::rollback_to(conn, n))
    }

    /// Fold work since `name` into the enclosing scope and drop `name` and
    /// every later savepoint.
    pub fn release_savepoint(&mut self, name: &str) -> TrellisResult<()> {
        let conn = &self.conn;
        self.ctx.release(name, |n| txn::release(conn, n))
    }
}

impl Access for Transaction<'_> {
    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<Vec<Row>> {
        self.ensure_active()?;
        self.conn.query_rows(sql, params)
    }

    fn execute_sql(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<usize> {
        self.ensure_active()?;
        self.conn.execute_sql(sql, params)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.ctx.is_active() {
            let conn = &self.conn;
            if let Err(e) = self.ctx.rollback(|| txn::rollback(conn)) {
                warn!(error = %e, "rollback of abandoned transaction failed");
            } else {
                debug!("abandoned transaction rolled back");
            }
        }
    }
}
