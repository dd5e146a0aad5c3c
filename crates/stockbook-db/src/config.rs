//! # Stockbook Configuration
//!
//! Configuration for the ledger database and the stock operations engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKBOOK_DB_PATH=/var/lib/stockbook/ledger.db                     │
//! │     STOCKBOOK_PICKING_STRATEGY=fifo                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockbook/stockbook.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockbook.stockbook/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockbook.toml
//! [database]
//! path = "stockbook.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [stock]
//! default_strategy = "fefo"  # fifo | fefo
//! expiring_soon_days = 30
//! skip_expired_batches = true
//! history_page_size = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockbook_core::{PickingStrategy, DEFAULT_EXPIRING_SOON_DAYS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock before the operation
    /// fails with `ConcurrencyConflict`.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockbook.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// =============================================================================
// Stock Settings
// =============================================================================

/// `[stock]` section: engine behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSettings {
    /// Strategy used when a pick request does not name one.
    #[serde(default)]
    pub default_strategy: PickingStrategy,

    /// Horizon for "expiring soon" batch reports.
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: u32,

    /// When true, batches whose expiry date is today or earlier are never
    /// offered for picking.
    #[serde(default = "default_skip_expired")]
    pub skip_expired_batches: bool,

    /// Movement history page size when the query does not set one.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

fn default_expiring_soon_days() -> u32 {
    DEFAULT_EXPIRING_SOON_DAYS
}

fn default_skip_expired() -> bool {
    true
}

fn default_history_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for StockSettings {
    fn default() -> Self {
        StockSettings {
            default_strategy: PickingStrategy::default(),
            expiring_soon_days: default_expiring_soon_days(),
            skip_expired_batches: default_skip_expired(),
            history_page_size: default_history_page_size(),
        }
    }
}

// =============================================================================
// Stockbook Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockbookConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub stock: StockSettings,
}

impl StockbookConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockbook.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stockbook config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load stockbook config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses configuration from a TOML string (no env overrides).
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        let config: StockbookConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.stock.history_page_size == 0 || self.stock.history_page_size > MAX_PAGE_SIZE {
            return Err(DbError::InvalidConfig(format!(
                "stock.history_page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }

    /// Applies `STOCKBOOK_*` environment variables.
    ///
    /// A malformed value is reported as `InvalidConfig`.
    fn apply_env_overrides(&mut self) -> DbResult<()> {
        if let Ok(path) = std::env::var("STOCKBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("STOCKBOOK_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("STOCKBOOK_MAX_CONNECTIONS", &value)?;
        }

        if let Ok(value) = std::env::var("STOCKBOOK_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_env("STOCKBOOK_BUSY_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("STOCKBOOK_PICKING_STRATEGY") {
            debug!(strategy = %value, "Overriding picking strategy from environment");
            self.stock.default_strategy = value.parse().map_err(|_| {
                DbError::InvalidConfig(format!(
                    "STOCKBOOK_PICKING_STRATEGY must be fifo or fefo, got '{}'",
                    value
                ))
            })?;
        }

        if let Ok(value) = std::env::var("STOCKBOOK_EXPIRING_SOON_DAYS") {
            self.stock.expiring_soon_days = parse_env("STOCKBOOK_EXPIRING_SOON_DAYS", &value)?;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockbook", "stockbook")
            .map(|dirs| dirs.config_dir().join("stockbook.toml"))
    }

    /// Database pool configuration derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> DbResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DbError::InvalidConfig(format!("{} has invalid value '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StockbookConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.stock.default_strategy, PickingStrategy::Fefo);
        assert_eq!(config.stock.expiring_soon_days, 30);
        assert!(config.stock.skip_expired_batches);
        assert_eq!(config.stock.history_page_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StockbookConfig::from_toml(
            r#"
            [stock]
            default_strategy = "fifo"
            expiring_soon_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.stock.default_strategy, PickingStrategy::Fifo);
        assert_eq!(config.stock.expiring_soon_days, 14);
        assert_eq!(config.stock.history_page_size, 50);
        assert_eq!(config.database.path, PathBuf::from("stockbook.db"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = StockbookConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        config.database.max_connections = 5;
        config.stock.history_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = StockbookConfig::from_toml("[stock]\ndefault_strategy = \"lifo\"").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(parse_env::<u32>("X", " 12 ").unwrap(), 12);
        assert!(parse_env::<u32>("X", "twelve").is_err());
    }

    #[test]
    fn test_db_config_from_settings() {
        let config = StockbookConfig::from_toml(
            r#"
            [database]
            path = "/tmp/ledger.db"
            max_connections = 3
            busy_timeout_ms = 250
            "#,
        )
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }
}
