//! Database module
//!
//! This module provides all database functionality for devledger, organized into:
//!
//! - **core**: SQLite connections, schema definitions and migrations
//! - **inventory**: The persistent user and device store
//! - **error**: The error taxonomy shared by both
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper
//! │   ├── migration   # Idempotent forward migration steps
//! │   └── schema      # Table definitions and SchemaManager
//! │
//! ├── inventory/      # Persistent storage
//! │   ├── users       # User repository
//! │   └── devices     # Device repository and owner join
//! │
//! └── error           # InventoryError
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use devledger::database::{DeviceFields, InventoryDatabase, UserFields};
//!
//! // Opening runs the schema manager; repositories are available afterwards
//! let db = InventoryDatabase::open_in_dir("~/.devledger")?;
//!
//! let ana = db.users().create(&UserFields::new("Ana", "ana@example.com"))?;
//! db.devices().create(&DeviceFields::new("Laptop").with_owner(Some(ana)))?;
//!
//! // Both lists from one exclusive transaction
//! let snapshot = db.snapshot()?;
//! ```

pub mod core;
pub mod error;
pub mod inventory;

// SQLite connection and schema management
pub use self::core::{
    DatabaseConn, MigrationStep, SchemaDefinitions, SchemaManager, SchemaStatus, MIGRATIONS,
    SCHEMA_VERSION,
};

// Error taxonomy
pub use error::{InventoryError, InventoryResult};

// Inventory database (main entry point)
pub use inventory::{
    Device, DeviceFields, DeviceRepository, DeviceStatus, DeviceWithOwner, InventoryDatabase,
    InventorySnapshot, User, UserFields, UserRepository, DATABASE_FILE_NAME,
};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
