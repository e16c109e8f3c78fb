use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::database::{InventoryDatabase, SchemaStatus, DATABASE_FILE_NAME};

/// Default lock wait in milliseconds
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

pub struct DevledgerConfig {
    /// Path to the directory holding the inventory database
    pub data_dir: String,

    /// How long a statement waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

const EMPTY_CONFIG: &str = r#"### devledger configuration file

### directory for the inventory database
# data_dir = "~/.devledger"

### how long to wait on a locked database (in milliseconds)
# busy_timeout_ms = 5000
"#;

impl Default for DevledgerConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.devledger", home_dir),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DevledgerConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Without an explicit path, `$HOME/.devledger/devledger.toml` is used.
    pub fn new(path: &Option<String>) -> Result<DevledgerConfig> {
        let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        let devledger_dir = format!("{}/.devledger", home_dir.to_string_lossy());

        let config_path = match path {
            Some(p) => p.clone(),
            None => {
                std::fs::create_dir_all(&devledger_dir)
                    .map_err(|e| anyhow!("Unable to create devledger directory: {}", e))?;
                format!("{}/devledger.toml", devledger_dir)
            }
        };

        let settings = load_settings(&config_path)?;
        Self::from_settings(&settings, &devledger_dir)
    }

    /// Build a configuration from flat key/value settings
    fn from_settings(config: &HashMap<String, String>, default_dir: &str) -> Result<Self> {
        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p),
            None => default_dir.to_string(),
        };

        let busy_timeout_ms = match config.get("busy_timeout_ms") {
            Some(s) => s
                .parse()
                .map_err(|e| anyhow!("Invalid busy_timeout_ms '{}': {}", s, e))?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(DevledgerConfig {
            data_dir,
            busy_timeout_ms,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, DATABASE_FILE_NAME)
    }

    /// Get the busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.devledger/devledger.toml", home_dir)
    }
}

/// Read the TOML file at `config_path`, then `DEVLEDGER_*` variables on top
///
/// A missing file is created from the commented template and contributes
/// nothing. E.g., `DEVLEDGER_DATA_DIR=/tmp/inventory devledger user list`
fn load_settings(config_path: &str) -> Result<HashMap<String, String>> {
    let mut builder = Config::builder();

    if Path::new(config_path).exists() {
        builder = builder.add_source(config::File::with_name(config_path));
    } else {
        std::fs::write(config_path, EMPTY_CONFIG)
            .map_err(|e| anyhow!("Unable to create config file {}: {}", config_path, e))?;
    }

    builder
        .add_source(config::Environment::with_prefix("DEVLEDGER"))
        .build()
        .map_err(|e| anyhow!("Failed to build configuration: {}", e))?
        .try_deserialize::<HashMap<String, String>>()
        .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{}", home.to_string_lossy(), rest),
        _ => path.to_string(),
    }
}

/// Information about the SQLite database
#[derive(Debug, Serialize, Clone)]
pub struct DatabaseInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub schema_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_count: Option<u64>,
}

/// Inspect the configured database without creating it
///
/// Opening an existing file brings its schema up to date, the same as any
/// other command would.
pub fn get_database_info(config: &DevledgerConfig) -> Result<DatabaseInfo> {
    let path = config.sqlite_path();
    let metadata = std::fs::metadata(&path).ok();

    let mut info = DatabaseInfo {
        path: path.clone(),
        exists: metadata.is_some(),
        size_bytes: metadata.map(|m| m.len()),
        schema_status: SchemaStatus::NotInitialized.to_string(),
        schema_version: None,
        user_count: None,
        device_count: None,
    };

    if !info.exists {
        return Ok(info);
    }

    let db = InventoryDatabase::open_with_timeout(&path, config.busy_timeout())?;
    let schema = db.schema();
    info.schema_status = schema.check_status()?.to_string();
    info.schema_version = Some(schema.schema_version()?);
    info.user_count = Some(db.users().count()?);
    info.device_count = Some(db.devices().count()?);

    Ok(info)
}

/// Format a size in bytes to a human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_defaults() {
        let config = DevledgerConfig::from_settings(&HashMap::new(), "/tmp/devledger").unwrap();
        assert_eq!(config.data_dir, "/tmp/devledger");
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.sqlite_path(), "/tmp/devledger/devledger.sqlite3");
    }

    #[test]
    fn test_from_settings_overrides() {
        let settings = HashMap::from([
            ("data_dir".to_string(), "/var/lib/devledger/".to_string()),
            ("busy_timeout_ms".to_string(), "250".to_string()),
        ]);
        let config = DevledgerConfig::from_settings(&settings, "/unused").unwrap();
        assert_eq!(config.sqlite_path(), "/var/lib/devledger/devledger.sqlite3");
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_busy_timeout() {
        let settings = HashMap::from([("busy_timeout_ms".to_string(), "soon".to_string())]);
        assert!(DevledgerConfig::from_settings(&settings, "/unused").is_err());
    }

    #[test]
    fn test_load_settings_writes_template_then_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devledger.toml");
        let path = path.to_str().unwrap();

        let settings = load_settings(path).unwrap();
        assert!(!settings.contains_key("busy_timeout_ms"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), EMPTY_CONFIG);

        std::fs::write(path, "data_dir = \"/srv/devledger\"\nbusy_timeout_ms = 250\n").unwrap();
        let settings = load_settings(path).unwrap();
        let config = DevledgerConfig::from_settings(&settings, "/unused").unwrap();
        assert_eq!(config.data_dir, "/srv/devledger");
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn test_database_info() {
        let dir = tempfile::tempdir().unwrap();
        let config = DevledgerConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            busy_timeout_ms: 100,
        };

        let info = get_database_info(&config).unwrap();
        assert!(!info.exists);
        assert_eq!(info.user_count, None);

        let db = InventoryDatabase::open_with_config(&config).unwrap();
        db.users()
            .create(&crate::database::UserFields::new("Ana", "a@b.com"))
            .unwrap();
        drop(db);

        let info = get_database_info(&config).unwrap();
        assert!(info.exists);
        assert_eq!(info.schema_status, "current");
        assert_eq!(info.user_count, Some(1));
        assert_eq!(info.device_count, Some(0));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
