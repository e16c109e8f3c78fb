//! Incremental schema migration steps
//!
//! Each step brings the schema to its `target` version. There is no
//! migration-history table, so every step first checks whether its change is
//! already present and only alters the schema when it is not.

use rusqlite::Connection;

/// A single forward migration
pub struct MigrationStep {
    /// Schema version the store is at once this step has run
    pub target: u32,
    pub description: &'static str,
    /// Returns true when the change is already present
    pub is_applied: fn(&Connection) -> rusqlite::Result<bool>,
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

impl MigrationStep {
    /// Apply the step unless its change is already present
    ///
    /// Returns whether the schema was altered.
    pub fn apply_if_needed(&self, conn: &Connection) -> rusqlite::Result<bool> {
        if (self.is_applied)(conn)? {
            return Ok(false);
        }
        (self.apply)(conn)?;
        Ok(true)
    }
}

/// All known steps, ordered by target version.
///
/// Version 1 is the baseline `users`/`devices` layout and has no step of its own.
pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        target: 2,
        description: "add users.phone column",
        is_applied: |conn| column_exists(conn, "users", "phone"),
        apply: |conn| conn.execute_batch("ALTER TABLE users ADD COLUMN phone TEXT"),
    },
    MigrationStep {
        target: 3,
        description: "index devices by owner",
        is_applied: |conn| index_exists(conn, "idx_devices_owner_id"),
        apply: |conn| {
            conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_devices_owner_id ON devices(owner_id)",
            )
        },
    },
];

/// Check whether `table` has a column called `column`
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check whether an index with the given name exists
pub fn index_exists(conn: &Connection, index: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?1",
        [index],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
