//! Device repository
//!
//! Data access operations for the `devices` table, including the owner join.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_optional, require_non_empty};
use crate::database::error::{owner_write_error, storage_error, InventoryResult};

/// Known device states
///
/// The column itself is free text; anything unset or unrecognized reads back
/// as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceStatus {
    Active,
    Inactive,
    UnderRepair,
    #[default]
    Unknown,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 4] = [
        DeviceStatus::Active,
        DeviceStatus::Inactive,
        DeviceStatus::UnderRepair,
        DeviceStatus::Unknown,
    ];

    /// Text written to the `status` column; `Unknown` is stored as absent
    pub fn as_stored(&self) -> Option<&'static str> {
        match self {
            DeviceStatus::Active => Some("Active"),
            DeviceStatus::Inactive => Some("Inactive"),
            DeviceStatus::UnderRepair => Some("Under repair"),
            DeviceStatus::Unknown => None,
        }
    }

    pub fn from_stored(text: Option<&str>) -> Self {
        text.and_then(|t| t.parse().ok())
            .unwrap_or(DeviceStatus::Unknown)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Active => write!(f, "Active"),
            DeviceStatus::Inactive => write!(f, "Inactive"),
            DeviceStatus::UnderRepair => write!(f, "Under repair"),
            DeviceStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "under repair" | "under-repair" | "under_repair" => Ok(Self::UnderRepair),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!(
                "unknown device status '{}', expected one of: active, inactive, under-repair, unknown",
                s
            )),
        }
    }
}

/// A stored device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    /// Stored status text, kept verbatim
    pub status: Option<String>,
    pub owner_id: Option<i64>,
}

impl Device {
    pub fn status_kind(&self) -> DeviceStatus {
        DeviceStatus::from_stored(self.status.as_deref())
    }
}

/// A device together with its owner's name, if it has an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceWithOwner {
    #[serde(flatten)]
    pub device: Device,
    pub owner_name: Option<String>,
}

/// Editable device fields, written together on create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFields {
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<String>,
    /// `None` means unassigned
    pub owner_id: Option<i64>,
}

impl DeviceFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status.as_stored().map(str::to_string);
        self
    }

    pub fn with_owner(mut self, owner_id: Option<i64>) -> Self {
        self.owner_id = owner_id;
        self
    }

    fn validate(&self) -> InventoryResult<()> {
        require_non_empty("name", &self.name)
    }
}

/// Repository for device operations
pub struct DeviceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DeviceRepository<'a> {
    /// Create a new device repository
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a device and return its generated id
    ///
    /// An `owner_id` that does not match a user fails with
    /// `ReferentialIntegrity` and inserts nothing.
    pub fn create(&self, fields: &DeviceFields) -> InventoryResult<i64> {
        fields.validate()?;

        self.conn
            .execute(
                "INSERT INTO devices (name, model, serial_number, status, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    fields.name,
                    normalize_optional(fields.model.as_deref()),
                    normalize_optional(fields.serial_number.as_deref()),
                    normalize_optional(fields.status.as_deref()),
                    fields.owner_id
                ],
            )
            .map_err(|e| owner_write_error("create device", fields.owner_id, e))?;

        let id = self.conn.last_insert_rowid();
        debug!("Created device {}", id);
        Ok(id)
    }

    /// Overwrite every editable field of a device
    ///
    /// Returns `false` when no device has the given id.
    pub fn update(&self, id: i64, fields: &DeviceFields) -> InventoryResult<bool> {
        fields.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE devices
                 SET name = ?1, model = ?2, serial_number = ?3, status = ?4, owner_id = ?5
                 WHERE id = ?6",
                params![
                    fields.name,
                    normalize_optional(fields.model.as_deref()),
                    normalize_optional(fields.serial_number.as_deref()),
                    normalize_optional(fields.status.as_deref()),
                    fields.owner_id,
                    id
                ],
            )
            .map_err(|e| owner_write_error("update device", fields.owner_id, e))?;

        debug!("Updated device {} ({} rows)", id, changed);
        Ok(changed > 0)
    }

    /// Delete a device
    pub fn delete(&self, id: i64) -> InventoryResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM devices WHERE id = ?1", [id])
            .map_err(|e| storage_error("delete device", e))?;

        debug!("Deleted device {} ({} rows)", id, changed);
        Ok(changed > 0)
    }

    /// Look up a single device
    pub fn get(&self, id: i64) -> InventoryResult<Option<Device>> {
        let result = self.conn.query_row(
            "SELECT id, name, model, serial_number, status, owner_id
             FROM devices WHERE id = ?1",
            [id],
            row_to_device,
        );

        match result {
            Ok(device) => Ok(Some(device)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(storage_error("get device", e)),
        }
    }

    /// All devices sorted by name, each with its owner's name
    ///
    /// Unassigned devices are included with no owner name.
    pub fn list(&self) -> InventoryResult<Vec<DeviceWithOwner>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT d.id, d.name, d.model, d.serial_number, d.status, d.owner_id,
                        u.name AS owner_name
                 FROM devices AS d LEFT JOIN users AS u ON d.owner_id = u.id
                 ORDER BY d.name, d.id",
            )
            .map_err(|e| storage_error("list devices", e))?;

        let devices = stmt
            .query_map([], |row| {
                Ok(DeviceWithOwner {
                    device: row_to_device(row)?,
                    owner_name: row.get(6)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| storage_error("list devices", e))?;
        Ok(devices)
    }

    /// Devices assigned to one user, sorted by name
    pub fn list_by_owner(&self, owner_id: i64) -> InventoryResult<Vec<Device>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, model, serial_number, status, owner_id
                 FROM devices WHERE owner_id = ?1
                 ORDER BY name, id",
            )
            .map_err(|e| storage_error("list devices by owner", e))?;

        let devices = stmt
            .query_map([owner_id], row_to_device)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| storage_error("list devices by owner", e))?;
        Ok(devices)
    }

    /// Get the count of devices
    pub fn count(&self) -> InventoryResult<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))
            .map_err(|e| storage_error("count devices", e))
    }
}

fn row_to_device(row: &Row) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        model: row.get(2)?,
        serial_number: row.get(3)?,
        status: row.get(4)?,
        owner_id: row.get(5)?,
    })
}
