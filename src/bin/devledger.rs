use clap::{Parser, Subcommand};
use devledger::*;
use tracing::Level;

mod commands;

use commands::device::DeviceArgs;
use commands::user::UserArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.devledger/devledger.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, edit, remove and list users
    User(UserArgs),

    /// Add, edit, remove and list devices
    Device(DeviceArgs),

    /// Show all users and devices from one consistent read
    Overview,

    /// Show configuration and database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match DevledgerConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => commands::fail(e),
    };
    let output_format = cli.format;

    match cli.command {
        Commands::User(args) => commands::user::run(&open_database(&config), args, output_format),
        Commands::Device(args) => {
            commands::device::run(&open_database(&config), args, output_format)
        }
        Commands::Overview => commands::overview::run(&open_database(&config), output_format),
        Commands::Status => commands::status::run(&config, output_format),
    }
}

/// Open the configured database; the schema is brought up to date before
/// any command touches it
fn open_database(config: &DevledgerConfig) -> InventoryDatabase {
    match InventoryDatabase::open_with_config(config) {
        Ok(db) => db,
        Err(e) => commands::fail(format!("cannot open inventory database: {:#}", e)),
    }
}
