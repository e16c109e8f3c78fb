//! Database connection management
//!
//! This module provides the SQLite connection wrapper used by the inventory database.

use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::database::error::{storage_error, InventoryResult};

/// Default time a statement waits on a locked database before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>, busy_timeout: Duration) -> InventoryResult<Self> {
        let conn = match path {
            Some(p) => Connection::open(p).map_err(|e| storage_error("open database", e))?,
            None => Connection::open_in_memory()
                .map_err(|e| storage_error("open in-memory database", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure(busy_timeout)?;
        Ok(db)
    }

    /// Open a database file with the default busy timeout
    pub fn open_path(path: &str) -> InventoryResult<Self> {
        Self::open(Some(path), DEFAULT_BUSY_TIMEOUT)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> InventoryResult<Self> {
        Self::open(None, DEFAULT_BUSY_TIMEOUT)
    }

    /// Per-connection settings. Journal mode is persistent and belongs to
    /// schema creation, so it is not set here.
    fn configure(&self, busy_timeout: Duration) -> InventoryResult<()> {
        // Foreign keys are off by default in SQLite and must be enabled on
        // every connection for ON DELETE SET NULL to fire
        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| storage_error("enable foreign keys", e))?;

        self.conn
            .busy_timeout(busy_timeout)
            .map_err(|e| storage_error("set busy timeout", e))?;

        Ok(())
    }

    /// Begin an exclusive transaction
    ///
    /// No other connection can write until the returned transaction is
    /// committed or dropped.
    pub fn exclusive_transaction(&self) -> InventoryResult<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Exclusive)
            .map_err(|e| storage_error("begin exclusive transaction", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> InventoryResult<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| storage_error("check table existence", e))?;
        Ok(count > 0)
    }
}
