//! Database schema management
//!
//! This module provides the table definitions for the inventory database and
//! the manager that creates and migrates them. The schema version is kept in
//! SQLite's `user_version` header field.

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use super::migration::{MigrationStep, MIGRATIONS};
use crate::database::error::{storage_error, InventoryError, InventoryResult};

/// Current schema version
/// Increment this and add a [`MigrationStep`] when changing the schema
pub const SCHEMA_VERSION: u32 = 3;

/// Schema definitions for all tables in the inventory database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    pub const USERS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT
        );
    "#;

    /// Devices reference their owner; deleting the owner clears the reference
    pub const DEVICES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            model TEXT,
            serial_number TEXT,
            status TEXT,
            owner_id INTEGER,
            FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
        );
    "#;

    pub const DEVICES_INDEXES: &'static [&'static str] =
        &["CREATE INDEX IF NOT EXISTS idx_devices_owner_id ON devices(owner_id)"];

    pub const REQUIRED_TABLES: &'static [&'static str] = &["users", "devices"];
}

/// Schema manager for the inventory database
///
/// Handles schema initialization, version checking, and migrations.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Bring the store to [`SCHEMA_VERSION`]
    ///
    /// Safe to call on every start: a store that is already current is left
    /// untouched. Returns the version the store is at afterwards.
    pub fn ensure_schema(&self) -> InventoryResult<u32> {
        let current = self
            .read_version()
            .map_err(|e| migration_failed(0, SCHEMA_VERSION, e))?;

        if current >= SCHEMA_VERSION {
            if current > SCHEMA_VERSION {
                warn!(
                    "Database schema v{} is newer than supported v{}, leaving it untouched",
                    current, SCHEMA_VERSION
                );
            }
            return Ok(current);
        }

        if current == 0 {
            info!("Initializing inventory database schema v{}", SCHEMA_VERSION);
            self.create_fresh()
                .map_err(|e| migration_failed(0, SCHEMA_VERSION, e))?;
            return Ok(SCHEMA_VERSION);
        }

        info!(
            "Inventory database needs migration from v{} to v{}",
            current, SCHEMA_VERSION
        );
        self.migrate(current, MIGRATIONS, SCHEMA_VERSION)
    }

    /// Create both tables at the latest layout and record the latest version
    fn create_fresh(&self) -> rusqlite::Result<()> {
        // Journal mode cannot change inside a transaction
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!("Journal mode set to {}", mode);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(SchemaDefinitions::USERS_TABLE)?;
        tx.execute_batch(SchemaDefinitions::DEVICES_TABLE)?;
        for index_sql in SchemaDefinitions::DEVICES_INDEXES {
            tx.execute_batch(index_sql)?;
        }

        // Tables left behind by an unversioned build may predate later steps
        for step in MIGRATIONS {
            if step.apply_if_needed(&tx)? {
                info!("Applied schema step v{}: {}", step.target, step.description);
            }
        }

        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()
    }

    /// Run every step above `current` in order, then record `latest`
    ///
    /// Each step commits together with its target version, so a failure
    /// leaves the store at the last completed step.
    fn migrate(&self, current: u32, steps: &[MigrationStep], latest: u32) -> InventoryResult<u32> {
        let mut version = current;

        for step in steps.iter().filter(|s| s.target > current && s.target <= latest) {
            let from = version;
            let run = || -> rusqlite::Result<bool> {
                let tx = self.conn.unchecked_transaction()?;
                let altered = step.apply_if_needed(&tx)?;
                tx.pragma_update(None, "user_version", step.target)?;
                tx.commit()?;
                Ok(altered)
            };

            match run() {
                Ok(true) => info!("Applied schema step v{}: {}", step.target, step.description),
                Ok(false) => debug!(
                    "Schema step v{} already present: {}",
                    step.target, step.description
                ),
                Err(e) => return Err(migration_failed(from, step.target, e)),
            }
            version = step.target;
        }

        if version < latest {
            self.conn
                .pragma_update(None, "user_version", latest)
                .map_err(|e| migration_failed(version, latest, e))?;
            version = latest;
        }

        Ok(version)
    }

    /// Check the current schema status
    pub fn check_status(&self) -> InventoryResult<SchemaStatus> {
        let current_version = self.schema_version()?;

        if current_version == 0 {
            return Ok(SchemaStatus::NotInitialized);
        }

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            // Database is from a newer version
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    /// Get the current schema version from the database
    pub fn schema_version(&self) -> InventoryResult<u32> {
        self.read_version()
            .map_err(|e| storage_error("read schema version", e))
    }

    fn read_version(&self) -> rusqlite::Result<u32> {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
    }

    /// Column names of `table` in declaration order
    pub fn table_columns(&self, table: &str) -> InventoryResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| storage_error("read table columns", e))?;
        let columns = stmt
            .query_map([table], |row| row.get(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
            .map_err(|e| storage_error("read table columns", e))?;
        Ok(columns)
    }

    /// Verify schema integrity by checking required tables exist
    fn verify_integrity(&self) -> InventoryResult<bool> {
        for table in SchemaDefinitions::REQUIRED_TABLES {
            let exists: i32 = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .map_err(|e| storage_error("verify schema", e))?;

            if exists == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn migration_failed(from: u32, to: u32, source: rusqlite::Error) -> InventoryError {
    error!(from, to, error = %source, "schema migration failed");
    InventoryError::SchemaMigration { from, to, source }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Schema is current and valid
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Version says current but required tables are missing
    Corrupted,
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::NotInitialized => write!(f, "not initialized"),
            SchemaStatus::Current => write!(f, "current"),
            SchemaStatus::NeedsMigration { from, to } => {
                write!(f, "needs migration (v{} -> v{})", from, to)
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => write!(
                f,
                "incompatible (database v{}, supported v{})",
                database_version, required_version
            ),
            SchemaStatus::Corrupted => write!(f, "corrupted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::DatabaseConn;

    /// Layout written by builds that predate the phone column and the owner index
    const LEGACY_V1: &str = r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );
        CREATE TABLE devices (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            model TEXT,
            serial_number TEXT,
            status TEXT,
            owner_id INTEGER,
            FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
        );
        PRAGMA user_version = 1;
    "#;

    fn create_test_db() -> DatabaseConn {
        DatabaseConn::open_in_memory().unwrap()
    }

    fn fresh_columns() -> (Vec<String>, Vec<String>) {
        let db = create_test_db();
        let manager = SchemaManager::new(&db.conn);
        manager.ensure_schema().unwrap();
        (
            manager.table_columns("users").unwrap(),
            manager.table_columns("devices").unwrap(),
        )
    }

    fn never_applied(_: &Connection) -> rusqlite::Result<bool> {
        Ok(false)
    }

    fn broken_apply(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch("ALTER TABLE no_such_table ADD COLUMN x TEXT")
    }

    #[test]
    fn test_schema_not_initialized() {
        let db = create_test_db();
        let manager = SchemaManager::new(&db.conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_ensure_schema_fresh() {
        let db = create_test_db();
        let manager = SchemaManager::new(&db.conn);

        assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.schema_version().unwrap(), SCHEMA_VERSION);

        assert_eq!(
            manager.table_columns("users").unwrap(),
            vec!["id", "name", "email", "phone"]
        );
        assert_eq!(
            manager.table_columns("devices").unwrap(),
            vec!["id", "name", "model", "serial_number", "status", "owner_id"]
        );
    }

    #[test]
    fn test_ensure_schema_idempotent() {
        let db = create_test_db();
        let manager = SchemaManager::new(&db.conn);
        manager.ensure_schema().unwrap();

        db.conn
            .execute(
                "INSERT INTO users (name, email, phone) VALUES ('Ana', 'a@b.com', '555')",
                [],
            )
            .unwrap();

        for _ in 0..3 {
            assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION);
        }

        let (users, devices) = fresh_columns();
        assert_eq!(manager.table_columns("users").unwrap(), users);
        assert_eq!(manager.table_columns("devices").unwrap(), devices);

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_migrate_legacy_store_matches_fresh() {
        let db = create_test_db();
        db.conn.execute_batch(LEGACY_V1).unwrap();
        db.conn
            .execute(
                "INSERT INTO users (name, email) VALUES ('Ana', 'a@b.com')",
                [],
            )
            .unwrap();

        let manager = SchemaManager::new(&db.conn);
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NeedsMigration {
                from: 1,
                to: SCHEMA_VERSION
            }
        );

        assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);

        let (users, devices) = fresh_columns();
        assert_eq!(manager.table_columns("users").unwrap(), users);
        assert_eq!(manager.table_columns("devices").unwrap(), devices);
        assert!(crate::database::core::index_exists(&db.conn, "idx_devices_owner_id").unwrap());

        // Existing rows survive, new column is empty
        let (name, phone): (String, Option<String>) = db
            .conn
            .query_row("SELECT name, phone FROM users", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(phone, None);
    }

    #[test]
    fn test_unversioned_legacy_store_matches_fresh() {
        // Builds without versioning left the tables behind at user_version 0
        let db = create_test_db();
        db.conn
            .execute_batch(LEGACY_V1.replace("PRAGMA user_version = 1;", "").as_str())
            .unwrap();
        db.conn
            .execute(
                "INSERT INTO users (name, email) VALUES ('Ana', 'a@b.com')",
                [],
            )
            .unwrap();

        let manager = SchemaManager::new(&db.conn);
        assert_eq!(manager.schema_version().unwrap(), 0);
        assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);

        let (users, devices) = fresh_columns();
        assert_eq!(manager.table_columns("users").unwrap(), users);
        assert_eq!(manager.table_columns("devices").unwrap(), devices);
        assert!(crate::database::core::index_exists(&db.conn, "idx_devices_owner_id").unwrap());

        let (name, phone): (String, Option<String>) = db
            .conn
            .query_row("SELECT name, phone FROM users", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(phone, None);
    }

    #[test]
    fn test_migrate_tolerates_step_already_present() {
        // Some v1 stores already carry the phone column
        let db = create_test_db();
        db.conn
            .execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY NOT NULL, name TEXT NOT NULL,
                     email TEXT NOT NULL, phone TEXT);
                 PRAGMA user_version = 1;",
            )
            .unwrap();
        db.conn.execute_batch(SchemaDefinitions::DEVICES_TABLE).unwrap();

        let manager = SchemaManager::new(&db.conn);
        assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION);

        let (users, _) = fresh_columns();
        assert_eq!(manager.table_columns("users").unwrap(), users);
    }

    #[test]
    fn test_newer_schema_left_untouched() {
        let db = create_test_db();
        let manager = SchemaManager::new(&db.conn);
        manager.ensure_schema().unwrap();
        db.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION + 5)
            .unwrap();

        assert_eq!(manager.ensure_schema().unwrap(), SCHEMA_VERSION + 5);
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::Incompatible {
                database_version: SCHEMA_VERSION + 5,
                required_version: SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn test_failed_step_reports_transition() {
        let db = create_test_db();
        db.conn.execute_batch(LEGACY_V1).unwrap();
        let manager = SchemaManager::new(&db.conn);

        let steps = [MigrationStep {
            target: 2,
            description: "broken step",
            is_applied: never_applied,
            apply: broken_apply,
        }];

        let err = manager.migrate(1, &steps, 2).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::SchemaMigration { from: 1, to: 2, .. }
        ));

        // The failed step rolled back, version did not advance
        assert_eq!(manager.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_version_recorded_without_step() {
        let db = create_test_db();
        db.conn.execute_batch(LEGACY_V1).unwrap();
        let manager = SchemaManager::new(&db.conn);

        assert_eq!(manager.migrate(1, &[], 2).unwrap(), 2);
        assert_eq!(manager.schema_version().unwrap(), 2);
    }

    #[test]
    fn test_corrupted_schema() {
        let db = create_test_db();
        db.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)
            .unwrap();

        let manager = SchemaManager::new(&db.conn);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Corrupted);
    }

    #[test]
    fn test_fresh_file_store_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.sqlite3");
        let db = DatabaseConn::open_path(path.to_str().unwrap()).unwrap();

        SchemaManager::new(&db.conn).ensure_schema().unwrap();

        let mode: String = db
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }
}
