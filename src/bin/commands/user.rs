use clap::{Args, Subcommand};
use devledger::{Device, InventoryDatabase, OutputFormat, User, UserFields};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use super::device::DeviceDisplay;
use super::{fail, or_dash, print_message, print_output};

/// Arguments for the User command
#[derive(Args)]
pub struct UserArgs {
    #[clap(subcommand)]
    pub command: UserCommands,
}

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user
    Add {
        /// Full name
        #[clap(long)]
        name: String,

        /// Email address
        #[clap(long)]
        email: String,

        /// Phone number
        #[clap(long)]
        phone: Option<String>,
    },

    /// Overwrite all fields of a user; omitted optional fields are cleared
    Edit {
        #[clap(value_name = "ID")]
        id: i64,

        #[clap(long)]
        name: String,

        #[clap(long)]
        email: String,

        #[clap(long)]
        phone: Option<String>,
    },

    /// Remove a user; their devices become unassigned
    Rm {
        #[clap(value_name = "ID")]
        id: i64,
    },

    /// Show one user and the devices assigned to them
    Show {
        #[clap(value_name = "ID")]
        id: i64,
    },

    /// List all users by name
    List,
}

#[derive(Tabled)]
pub(crate) struct UserDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
}

impl From<&User> for UserDisplay {
    fn from(user: &User) -> Self {
        UserDisplay {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: or_dash(user.phone.as_deref()),
        }
    }
}

#[derive(Serialize)]
struct UserDetails<'a> {
    user: &'a User,
    devices: &'a [Device],
}

pub fn run(db: &InventoryDatabase, args: UserArgs, output_format: OutputFormat) {
    match args.command {
        UserCommands::Add { name, email, phone } => {
            let fields = user_fields(name, email, phone);
            match db.users().create(&fields) {
                Ok(id) => print_message(
                    &format!("Added user {} ({})", id, fields.name),
                    &json!({ "id": id }),
                    output_format,
                ),
                Err(e) => fail(e),
            }
        }
        UserCommands::Edit {
            id,
            name,
            email,
            phone,
        } => match db.users().update(id, &user_fields(name, email, phone)) {
            Ok(true) => print_message(
                &format!("Updated user {}", id),
                &json!({ "id": id, "updated": true }),
                output_format,
            ),
            Ok(false) => fail(format!("user {} not found", id)),
            Err(e) => fail(e),
        },
        UserCommands::Rm { id } => match db.delete_user(id) {
            Ok(Some(assigned)) => print_message(
                &format!("Deleted user {} ({} devices unassigned)", id, assigned),
                &json!({ "id": id, "deleted": true, "devices_unassigned": assigned }),
                output_format,
            ),
            Ok(None) => fail(format!("user {} not found", id)),
            Err(e) => fail(e),
        },
        UserCommands::Show { id } => run_show(db, id, output_format),
        UserCommands::List => match db.users().list() {
            Ok(users) => {
                let rows: Vec<UserDisplay> = users.iter().map(UserDisplay::from).collect();
                print_output(&users, rows, output_format);
            }
            Err(e) => fail(e),
        },
    }
}

fn run_show(db: &InventoryDatabase, id: i64, output_format: OutputFormat) {
    let user = match db.users().get(id) {
        Ok(Some(user)) => user,
        Ok(None) => fail(format!("user {} not found", id)),
        Err(e) => fail(e),
    };
    let devices = match db.devices().list_by_owner(id) {
        Ok(devices) => devices,
        Err(e) => fail(e),
    };

    if output_format.is_json() {
        let details = UserDetails {
            user: &user,
            devices: &devices,
        };
        print_output(&details, vec![UserDisplay::from(&user)], output_format);
        return;
    }

    print_output(&user, vec![UserDisplay::from(&user)], output_format);
    if devices.is_empty() {
        println!("No devices assigned");
    } else {
        let rows: Vec<DeviceDisplay> = devices.iter().map(DeviceDisplay::from).collect();
        print_output(&devices, rows, output_format);
    }
}

fn user_fields(name: String, email: String, phone: Option<String>) -> UserFields {
    UserFields { name, email, phone }
}
