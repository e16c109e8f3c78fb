#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Devledger - a local inventory of users and their devices
//!
//! Devledger keeps users and the devices assigned to them in a local SQLite
//! file. It can be used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Database, schema migrations, configuration | `rusqlite`, `config` |
//! | `cli` | The `devledger` binary | `clap`, `tabled`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`database`]**: All database functionality
//!   - `core`: SQLite connection management, schema definitions and migrations
//!   - `inventory`: User and device repositories
//!   - `error`: The error taxonomy
//! - **[`config`]**: Configuration management
//! - **[`output`]**: Output formats used by the CLI
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use devledger::{DeviceFields, DeviceStatus, InventoryDatabase, UserFields};
//!
//! let db = InventoryDatabase::open_in_dir("~/.devledger")?;
//!
//! let ana = db.users().create(&UserFields::new("Ana", "ana@example.com").with_phone("555"))?;
//! db.devices().create(
//!     &DeviceFields::new("Laptop")
//!         .with_status(DeviceStatus::Active)
//!         .with_owner(Some(ana)),
//! )?;
//!
//! for entry in db.devices().list()? {
//!     println!("{} -> {:?}", entry.device.name, entry.owner_name);
//! }
//!
//! // Devices keep existing when their owner is removed
//! db.users().delete(ana)?;
//! ```

pub mod config;
pub mod database;
pub mod output;

pub use crate::config::{format_size, get_database_info, DatabaseInfo, DevledgerConfig};

pub use database::{
    Device, DeviceFields, DeviceRepository, DeviceStatus, DeviceWithOwner, InventoryDatabase,
    InventoryError, InventoryResult, InventorySnapshot, SchemaManager, SchemaStatus, User,
    UserFields, UserRepository, SCHEMA_VERSION,
};

pub use output::OutputFormat;
