//! # Engine Configuration
//!
//! Read once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`DUKAN_*`)
//! 2. Defaults (this file)

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 30;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Store name (printed on invoices and exports)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Upper bound for a daily export, in seconds
    pub export_timeout_secs: u64,
}

impl Default for EngineConfig {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Database: platform data directory, `dukan.db`
    /// - Store: "Dukan"
    /// - Currency: Rs
    /// - Export timeout: 30 seconds
    fn default() -> Self {
        EngineConfig {
            database_path: default_database_path(),
            store_name: "Dukan".to_string(),
            currency_symbol: "Rs".to_string(),
            export_timeout_secs: DEFAULT_EXPORT_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `DUKAN_DB_PATH`: Override the database file
    /// - `DUKAN_STORE_NAME`: Override store name
    /// - `DUKAN_EXPORT_TIMEOUT_SECS`: Override export timeout
    /// - `DUKAN_CURRENCY_SYMBOL`: Override currency symbol
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();

        if let Ok(path) = std::env::var("DUKAN_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(store_name) = std::env::var("DUKAN_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Ok(symbol) = std::env::var("DUKAN_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Ok(raw) = std::env::var("DUKAN_EXPORT_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.export_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid DUKAN_EXPORT_TIMEOUT_SECS"),
            }
        }

        config
    }

    /// Configuration for tests: in-memory database, short timeouts.
    pub fn in_memory() -> Self {
        EngineConfig {
            database_path: PathBuf::from(":memory:"),
            export_timeout_secs: 5,
            ..EngineConfig::default()
        }
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

/// Determines the database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.dukan.pos/dukan.db`
/// - **Windows**: `%APPDATA%\dukan\pos\data\dukan.db`
/// - **Linux**: `~/.local/share/pos/dukan.db`
///
/// Falls back to the working directory when no home directory exists.
pub fn default_database_path() -> PathBuf {
    match ProjectDirs::from("com", "dukan", "pos") {
        Some(dirs) => dirs.data_dir().join("dukan.db"),
        None => PathBuf::from("dukan.db"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.export_timeout(), Duration::from_secs(30));
        assert!(config.database_path.ends_with("dukan.db"));
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_in_memory() {
        let config = EngineConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.export_timeout_secs, 5);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(EngineConfig::in_memory()).unwrap();
        assert_eq!(json["storeName"], "Dukan");
        assert_eq!(json["exportTimeoutSecs"], 5);
    }
}
