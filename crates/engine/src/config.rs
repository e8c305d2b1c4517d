//! Database configuration.
//!
//! ```toml
//! path = "graph.db"
//! busy_timeout_ms = 2000
//! wal = true
//! access_mode = "read_write"
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 10
//! max_backoff_ms = 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trellis_concurrency::RetryPolicy;
use trellis_core::{TrellisError, TrellisResult};
use trellis_storage::{StoreOptions, DEFAULT_BUSY_TIMEOUT};

/// Controls whether the database allows writes or is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Allow both reads and writes (default).
    #[default]
    ReadWrite,
    /// Read-only mode: every transaction, and therefore every write, is
    /// rejected.
    ReadOnly,
}

/// Options for opening a [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// How long a connection waits on a locked database before it reports
    /// busy.
    pub busy_timeout_ms: u64,
    /// Write-ahead logging for file-backed databases.
    pub wal: bool,
    /// Read-write or read-only.
    pub access_mode: AccessMode,
    /// Retry policy for busy/locked write transactions.
    pub retry: RetryPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            wal: true,
            access_mode: AccessMode::ReadWrite,
            retry: RetryPolicy::default(),
        }
    }
}

impl GraphConfig {
    /// In-memory defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// File-backed defaults.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Set the busy timeout.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Enable or disable WAL.
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Parse from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> TrellisResult<Self> {
        toml::from_str(text)
            .map_err(|e| TrellisError::invalid_input(format!("invalid graph config: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrellisError::storage_with_source(
                format!("cannot read config {}", path.display()),
                e,
            )
        })?;
        Self::from_toml_str(&text)
    }

    /// True when writes are rejected.
    pub fn is_read_only(&self) -> bool {
        self.access_mode == AccessMode::ReadOnly
    }

    pub(crate) fn store_options(&self) -> StoreOptions {
        StoreOptions {
            path: self.path.clone(),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            wal: self.wal,
            // An in-memory database starts empty, so it is always opened
            // writable; the access mode is still enforced on transactions.
            read_only: self.is_read_only() && self.path.is_some(),
        }
    }
}
