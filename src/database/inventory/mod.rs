//! Inventory database storage
//!
//! This module provides the persistent store for users and the devices
//! assigned to them. Repositories are only reachable through
//! [`InventoryDatabase`], whose constructors bring the schema up to date
//! first, so no query can run against an unmigrated store.

mod devices;
mod users;

pub use devices::{Device, DeviceFields, DeviceRepository, DeviceStatus, DeviceWithOwner};
pub use users::{User, UserFields, UserRepository};

use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DevledgerConfig;
use crate::database::core::{DatabaseConn, SchemaManager, DEFAULT_BUSY_TIMEOUT};
use crate::database::error::{storage_error, InventoryError, InventoryResult};

/// File name of the database inside the data directory
pub const DATABASE_FILE_NAME: &str = "devledger.sqlite3";

/// Main inventory database (SQLite backend)
pub struct InventoryDatabase {
    db: DatabaseConn,
}

/// Both lists read inside one exclusive transaction
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub users: Vec<User>,
    pub devices: Vec<DeviceWithOwner>,
}

impl InventoryDatabase {
    /// Open the inventory database at the specified path
    ///
    /// The file is created if missing and its schema is created or migrated
    /// before this returns.
    pub fn open(path: &str) -> InventoryResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with an explicit bound on how long a statement waits for a lock
    pub fn open_with_timeout(path: &str, busy_timeout: Duration) -> InventoryResult<Self> {
        info!("Opening inventory database at {}", path);
        Self::initialize(DatabaseConn::open(Some(path), busy_timeout)?)
    }

    /// Open the inventory database from a data directory
    ///
    /// Uses the standard database file path: `{data_dir}/devledger.sqlite3`
    pub fn open_in_dir(data_dir: &str) -> InventoryResult<Self> {
        let path = format!("{}/{}", data_dir.trim_end_matches('/'), DATABASE_FILE_NAME);
        Self::open(&path)
    }

    /// Open the database described by a configuration, creating the data
    /// directory if needed
    pub fn open_with_config(config: &DevledgerConfig) -> anyhow::Result<Self> {
        crate::database::ensure_data_dir(&config.data_dir)?;
        let db = Self::open_with_timeout(&config.sqlite_path(), config.busy_timeout())?;
        Ok(db)
    }

    /// Create an in-memory inventory database (for testing)
    pub fn open_in_memory() -> InventoryResult<Self> {
        Self::initialize(DatabaseConn::open_in_memory()?)
    }

    fn initialize(db: DatabaseConn) -> InventoryResult<Self> {
        let version = SchemaManager::new(&db.conn).ensure_schema()?;
        debug!("Inventory database ready at schema v{}", version);
        Ok(Self { db })
    }

    /// Get the user repository
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.db.conn)
    }

    /// Get the device repository
    pub fn devices(&self) -> DeviceRepository<'_> {
        DeviceRepository::new(&self.db.conn)
    }

    /// Get the schema manager for status inspection
    pub fn schema(&self) -> SchemaManager<'_> {
        SchemaManager::new(&self.db.conn)
    }

    /// Get the underlying database connection
    pub fn connection(&self) -> &Connection {
        &self.db.conn
    }

    /// Run `f` inside an exclusive transaction
    ///
    /// Writers on other connections are held off until `f` returns, so every
    /// read inside sees the same state. The transaction rolls back if `f` fails.
    pub fn read_consistent<T, F>(&self, f: F) -> InventoryResult<T>
    where
        F: FnOnce(&Connection) -> InventoryResult<T>,
    {
        let tx = self.db.exclusive_transaction()?;
        let value = f(&*tx)?;
        tx.commit()
            .map_err(|e| storage_error("commit consistent read", e))?;
        Ok(value)
    }

    /// Delete a user and report how many devices lost their owner
    ///
    /// The count and the delete run in one exclusive transaction. Returns
    /// `None` when no user has the given id.
    pub fn delete_user(&self, id: i64) -> InventoryResult<Option<usize>> {
        self.read_consistent(|conn| {
            let assigned = DeviceRepository::new(conn).list_by_owner(id)?.len();
            let deleted = UserRepository::new(conn).delete(id)?;
            Ok(deleted.then_some(assigned))
        })
    }

    /// Load users and devices as one consistent view
    pub fn snapshot(&self) -> InventoryResult<InventorySnapshot> {
        self.read_consistent(|conn| {
            Ok(InventorySnapshot {
                users: UserRepository::new(conn).list()?,
                devices: DeviceRepository::new(conn).list()?,
            })
        })
    }
}

/// Treat blank optional text as absent
pub(crate) fn normalize_optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> InventoryResult<()> {
    if value.trim().is_empty() {
        debug!("Rejected write: {} is empty", field);
        return Err(InventoryError::Validation { field });
    }
    Ok(())
}
