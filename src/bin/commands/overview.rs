use devledger::{InventoryDatabase, OutputFormat};

use super::device::DeviceDisplay;
use super::user::UserDisplay;
use super::{fail, print_output};

/// Print both lists from a single exclusive read
pub fn run(db: &InventoryDatabase, output_format: OutputFormat) {
    let snapshot = match db.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => fail(e),
    };

    if output_format.is_json() {
        print_output(&snapshot, Vec::<UserDisplay>::new(), output_format);
        return;
    }

    println!("Users ({})", snapshot.users.len());
    let users: Vec<UserDisplay> = snapshot.users.iter().map(UserDisplay::from).collect();
    print_output(&snapshot.users, users, output_format);

    println!();
    println!("Devices ({})", snapshot.devices.len());
    let devices: Vec<DeviceDisplay> = snapshot.devices.iter().map(DeviceDisplay::from).collect();
    print_output(&snapshot.devices, devices, output_format);
}
