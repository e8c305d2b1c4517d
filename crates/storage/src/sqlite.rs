//! SQLite-backed property store.
//!
//! A file-backed store holds two connections: a writer that owns every
//! transaction, and a read-only connection (WAL mode) so reads outside a
//! transaction never wait behind a queued writer. An in-memory store has no
//! second view of the same database, so both paths share the writer.
//!
//! The writer sits behind a re-entrant lock: the thread running a unit of
//! work may issue plain reads through the store while it still holds the
//! connection for its transaction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};
use trellis_core::TrellisResult;

use crate::access::{Access, Row, SqlValue};
use crate::error::SqliteResultExt;
use crate::schema;

/// Default time a connection waits on a locked database before reporting
/// busy.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// How to open a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Database file; `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Busy handler timeout for every connection.
    pub busy_timeout: Duration,
    /// Use write-ahead logging (file-backed stores only).
    pub wal: bool,
    /// Open every connection read-only. The file must already exist.
    pub read_only: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            wal: true,
            read_only: false,
        }
    }
}

impl StoreOptions {
    /// Options for a file-backed store with defaults otherwise.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }
}

/// The embedded relational store holding the `nodes` and `edges` tables.
pub struct SqliteStore {
    writer: ReentrantMutex<Connection>,
    reader: Option<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("split_reader", &self.reader.is_some())
            .finish()
    }
}

impl SqliteStore {
    /// Open (creating if needed) a store according to `options`.
    pub fn open(options: &StoreOptions) -> TrellisResult<Self> {
        match &options.path {
            None => {
                let conn = Connection::open_in_memory().map_store_err()?;
                configure(&conn, options.busy_timeout)?;
                schema::initialize(&conn)?;
                info!("opened in-memory graph store");
                Ok(Self {
                    writer: ReentrantMutex::new(conn),
                    reader: None,
                    path: None,
                })
            }
            Some(path) => {
                let flags = if options.read_only {
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI
                } else {
                    OpenFlags::default()
                };
                let writer = Connection::open_with_flags(path, flags).map_store_err()?;
                configure(&writer, options.busy_timeout)?;
                if !options.read_only {
                    if options.wal {
                        let mode: String = writer
                            .pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                                row.get(0)
                            })
                            .map_store_err()?;
                        debug!(journal_mode = %mode, "journal mode set");
                    }
                    schema::initialize(&writer)?;
                }

                let reader = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
                )
                .map_store_err()?;
                configure(&reader, options.busy_timeout)?;

                info!(path = %path.display(), wal = options.wal, read_only = options.read_only, "opened graph store");
                Ok(Self {
                    writer: ReentrantMutex::new(writer),
                    reader: Some(Mutex::new(reader)),
                    path: Some(path.clone()),
                })
            }
        }
    }

    /// Open a private in-memory store.
    pub fn in_memory() -> TrellisResult<Self> {
        Self::open(&StoreOptions::default())
    }

    /// Database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when reads use their own connection.
    pub fn has_split_reader(&self) -> bool {
        self.reader.is_some()
    }

    /// Lock the writer connection. Re-entrant on the owning thread.
    pub fn writer(&self) -> ReentrantMutexGuard<'_, Connection> {
        self.writer.lock()
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> TrellisResult<T>) -> TrellisResult<T> {
        match &self.reader {
            Some(reader) => f(&reader.lock()),
            None => f(&self.writer.lock()),
        }
    }
}

impl Access for SqliteStore {
    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<Vec<Row>> {
        self.with_reader(|conn| conn.query_rows(sql, params))
    }

    /// Statements with side effects always go to the writer.
    fn execute_sql(&self, sql: &str, params: &[SqlValue]) -> TrellisResult<usize> {
        self.writer.lock().execute_sql(sql, params)
    }
}

fn configure(conn: &Connection, busy_timeout: Duration) -> TrellisResult<()> {
    conn.busy_timeout(busy_timeout).map_store_err()?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_store_err()?;
    Ok(())
}
