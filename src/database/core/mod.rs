//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite connection wrapper with configuration
//! - `SchemaManager`: Schema initialization and migration
//! - `MigrationStep`: One idempotent forward migration
//! - `SchemaStatus`: Schema state enumeration

mod connection;
mod migration;
mod schema;

pub use connection::{DatabaseConn, DEFAULT_BUSY_TIMEOUT};
pub use migration::{column_exists, index_exists, MigrationStep, MIGRATIONS};
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
