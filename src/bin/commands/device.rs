use clap::{Args, Subcommand};
use devledger::{
    Device, DeviceFields, DeviceStatus, DeviceWithOwner, InventoryDatabase, OutputFormat,
};
use serde_json::json;
use tabled::Tabled;

use super::{fail, or_dash, print_message, print_output};

/// Arguments for the Device command
#[derive(Args)]
pub struct DeviceArgs {
    #[clap(subcommand)]
    pub command: DeviceCommands,
}

/// Editable device fields shared by `add` and `edit`
#[derive(Args, Debug)]
pub struct DeviceFieldArgs {
    /// Device name
    #[clap(long)]
    name: String,

    /// Model name
    #[clap(long)]
    model: Option<String>,

    /// Serial number
    #[clap(long)]
    serial: Option<String>,

    /// Status: active, inactive, under-repair, or any other text
    #[clap(long)]
    status: Option<String>,

    /// Owner user ID; an empty value leaves the device unassigned
    #[clap(long)]
    owner: Option<String>,
}

/// Device subcommands
#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Add a new device
    Add {
        #[clap(flatten)]
        fields: DeviceFieldArgs,
    },

    /// Overwrite all fields of a device; omitted optional fields are cleared
    Edit {
        #[clap(value_name = "ID")]
        id: i64,

        #[clap(flatten)]
        fields: DeviceFieldArgs,
    },

    /// Remove a device
    Rm {
        #[clap(value_name = "ID")]
        id: i64,
    },

    /// Show one device
    Show {
        #[clap(value_name = "ID")]
        id: i64,
    },

    /// List devices by name with their owners
    List {
        /// Only devices assigned to this user ID
        #[clap(long)]
        owner: Option<i64>,
    },
}

#[derive(Tabled)]
pub(crate) struct DeviceDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Serial")]
    serial_number: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Owner")]
    owner: String,
}

impl From<&Device> for DeviceDisplay {
    fn from(device: &Device) -> Self {
        DeviceDisplay {
            id: device.id,
            name: device.name.clone(),
            model: or_dash(device.model.as_deref()),
            serial_number: or_dash(device.serial_number.as_deref()),
            // Unrecognized text is shown as stored
            status: device
                .status
                .clone()
                .unwrap_or_else(|| DeviceStatus::Unknown.to_string()),
            owner: device
                .owner_id
                .map(|id| format!("#{}", id))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

impl From<&DeviceWithOwner> for DeviceDisplay {
    fn from(entry: &DeviceWithOwner) -> Self {
        let mut display = DeviceDisplay::from(&entry.device);
        if let (Some(name), Some(id)) = (&entry.owner_name, entry.device.owner_id) {
            display.owner = format!("{} (#{})", name, id);
        }
        display
    }
}

pub fn run(db: &InventoryDatabase, args: DeviceArgs, output_format: OutputFormat) {
    match args.command {
        DeviceCommands::Add { fields } => {
            let fields = device_fields(fields);
            match db.devices().create(&fields) {
                Ok(id) => print_message(
                    &format!("Added device {} ({})", id, fields.name),
                    &json!({ "id": id }),
                    output_format,
                ),
                Err(e) => fail(e),
            }
        }
        DeviceCommands::Edit { id, fields } => {
            match db.devices().update(id, &device_fields(fields)) {
                Ok(true) => print_message(
                    &format!("Updated device {}", id),
                    &json!({ "id": id, "updated": true }),
                    output_format,
                ),
                Ok(false) => fail(format!("device {} not found", id)),
                Err(e) => fail(e),
            }
        }
        DeviceCommands::Rm { id } => match db.devices().delete(id) {
            Ok(true) => print_message(
                &format!("Deleted device {}", id),
                &json!({ "id": id, "deleted": true }),
                output_format,
            ),
            Ok(false) => fail(format!("device {} not found", id)),
            Err(e) => fail(e),
        },
        DeviceCommands::Show { id } => match db.devices().get(id) {
            Ok(Some(device)) => {
                print_output(&device, vec![DeviceDisplay::from(&device)], output_format)
            }
            Ok(None) => fail(format!("device {} not found", id)),
            Err(e) => fail(e),
        },
        DeviceCommands::List { owner: Some(owner) } => match db.devices().list_by_owner(owner) {
            Ok(devices) => {
                let rows: Vec<DeviceDisplay> = devices.iter().map(DeviceDisplay::from).collect();
                print_output(&devices, rows, output_format);
            }
            Err(e) => fail(e),
        },
        DeviceCommands::List { owner: None } => match db.devices().list() {
            Ok(devices) => {
                let rows: Vec<DeviceDisplay> = devices.iter().map(DeviceDisplay::from).collect();
                print_output(&devices, rows, output_format);
            }
            Err(e) => fail(e),
        },
    }
}

fn device_fields(args: DeviceFieldArgs) -> DeviceFields {
    let owner_id = match parse_owner(args.owner.as_deref()) {
        Ok(owner_id) => owner_id,
        Err(e) => fail(e),
    };

    DeviceFields {
        name: args.name,
        model: args.model,
        serial_number: args.serial,
        status: args.status.and_then(canonical_status),
        owner_id,
    }
}

/// Store known states in their canonical spelling, anything else verbatim
///
/// `unknown` is stored as absent, the same as `DeviceStatus::Unknown`.
fn canonical_status(text: String) -> Option<String> {
    match text.parse::<DeviceStatus>() {
        Ok(status) => status.as_stored().map(str::to_string),
        Err(_) => Some(text),
    }
}

/// Empty means unassigned
fn parse_owner(owner: Option<&str>) -> Result<Option<i64>, String> {
    match owner.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => id
            .parse()
            .map(Some)
            .map_err(|_| format!("owner must be a user ID, got '{}'", id)),
    }
}
