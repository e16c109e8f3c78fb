use devledger::{format_size, get_database_info, DatabaseInfo, DevledgerConfig, OutputFormat};
use serde::Serialize;
use tabled::Tabled;

use super::{fail, print_output};

#[derive(Debug, Serialize)]
struct StatusReport {
    config_file: String,
    data_dir: String,
    busy_timeout_ms: u64,
    database: DatabaseInfo,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Setting")]
    key: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn run(config: &DevledgerConfig, output_format: OutputFormat) {
    let database = match get_database_info(config) {
        Ok(info) => info,
        Err(e) => fail(format!("cannot inspect database: {:#}", e)),
    };

    let report = StatusReport {
        config_file: DevledgerConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        busy_timeout_ms: config.busy_timeout_ms,
        database,
    };

    let count = |value: Option<u64>| value.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
    let rows = vec![
        StatusRow {
            key: "Config File",
            value: report.config_file.clone(),
        },
        StatusRow {
            key: "Data Directory",
            value: report.data_dir.clone(),
        },
        StatusRow {
            key: "Busy Timeout",
            value: format!("{} ms", report.busy_timeout_ms),
        },
        StatusRow {
            key: "Database",
            value: report.database.path.clone(),
        },
        StatusRow {
            key: "Size",
            value: report
                .database
                .size_bytes
                .map(format_size)
                .unwrap_or_else(|| "-".to_string()),
        },
        StatusRow {
            key: "Schema",
            value: match report.database.schema_version {
                Some(v) => format!("v{} ({})", v, report.database.schema_status),
                None => report.database.schema_status.clone(),
            },
        },
        StatusRow {
            key: "Users",
            value: count(report.database.user_count),
        },
        StatusRow {
            key: "Devices",
            value: count(report.database.device_count),
        },
    ];

    print_output(&report, rows, output_format);
}
