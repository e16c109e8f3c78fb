//! Error types for the inventory database
//!
//! Every failure a caller can react to has its own variant. Not-found is not
//! an error: lookups return `Option` and mutations report whether a row matched.

use rusqlite::ffi;
use thiserror::Error;
use tracing::error;

/// Result type for inventory database operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors that can occur while opening or using the inventory database
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A schema step could not be applied. The database must not be used.
    #[error("schema migration from v{from} to v{to} failed: {source}")]
    SchemaMigration {
        from: u32,
        to: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// A required field was empty or whitespace-only
    #[error("validation failed: {field} must not be empty")]
    Validation { field: &'static str },

    /// The owner reference does not point at an existing user
    #[error("owner {owner_id} does not reference an existing user")]
    ReferentialIntegrity { owner_id: i64 },

    /// Any other SQLite failure (I/O, busy, locked, malformed file)
    #[error("storage error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl InventoryError {
    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InventoryError::Storage { source, .. } => matches!(
                source.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

/// Log a storage failure with its operation and wrap it
pub(crate) fn storage_error(operation: &'static str, source: rusqlite::Error) -> InventoryError {
    error!(operation, error = %source, "storage operation failed");
    InventoryError::Storage { operation, source }
}

/// Like [`storage_error`], but maps foreign-key violations on the owner column
/// to [`InventoryError::ReferentialIntegrity`]
pub(crate) fn owner_write_error(
    operation: &'static str,
    owner_id: Option<i64>,
    source: rusqlite::Error,
) -> InventoryError {
    match (owner_id, is_foreign_key_violation(&source)) {
        (Some(owner_id), true) => {
            error!(operation, owner_id, "owner reference rejected by foreign key");
            InventoryError::ReferentialIntegrity { owner_id }
        }
        _ => storage_error(operation, source),
    }
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
