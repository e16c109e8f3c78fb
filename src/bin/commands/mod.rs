pub mod device;
pub mod overview;
pub mod status;
pub mod user;

use std::fmt::Display;

use devledger::OutputFormat;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Print an error and exit with a failure code
pub(crate) fn fail(e: impl Display) -> ! {
    eprintln!("ERROR: {}", e);
    std::process::exit(1)
}

/// Render records in the requested format
///
/// JSON formats serialize `records` directly; table formats use `rows`.
pub(crate) fn print_output<R, D>(records: &R, rows: Vec<D>, output_format: OutputFormat)
where
    R: Serialize + ?Sized,
    D: Tabled,
{
    match output_format {
        OutputFormat::Table => println!("{}", Table::new(rows).with(Style::rounded())),
        OutputFormat::Markdown => println!("{}", Table::new(rows).with(Style::markdown())),
        OutputFormat::Json | OutputFormat::JsonPretty => match output_format.to_json(records) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing output: {}", e),
        },
        OutputFormat::Psv => {
            println!("{}", D::headers().join("|"));
            for row in &rows {
                println!("{}", row.fields().join("|"));
            }
        }
    }
}

/// Print a one-line confirmation, or a small JSON object for JSON formats
pub(crate) fn print_message<T: Serialize>(message: &str, value: &T, output_format: OutputFormat) {
    if output_format.is_json() {
        match output_format.to_json(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
    } else {
        println!("{}", message);
    }
}

/// Placeholder for absent optional values in tables
pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
