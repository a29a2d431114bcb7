//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::CalendarZone;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which store backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Nothing survives the process
    Memory,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("meterdb").join("meterdb.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./meterdb.db".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
        }
    }
}

/// Aggregation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationConfig {
    /// Wall clock for calendar grouping: "local" or "utc"
    #[serde(default)]
    pub timezone: CalendarZone,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("meterdb").join("config.toml")),
            Some(PathBuf::from("/etc/meterdb/config.toml")),
            Some(PathBuf::from("./meterdb.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparseable values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(path) = lookup("METERDB_DB_PATH") {
            self.storage.database_path = path;
        }
        if let Some(backend) = lookup("METERDB_BACKEND").as_deref().and_then(StorageBackend::parse) {
            self.storage.backend = backend;
        }

        // Aggregation overrides
        if let Some(zone) = lookup("METERDB_TIMEZONE").as_deref().and_then(CalendarZone::parse) {
            self.aggregation.timezone = zone;
        }

        // Logging overrides
        if let Some(level) = lookup("METERDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("METERDB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# meterdb Configuration
#
# Environment variables override these settings:
# - METERDB_DB_PATH
# - METERDB_BACKEND
# - METERDB_TIMEZONE
# - METERDB_LOG_LEVEL
# - METERDB_LOG_FORMAT

[storage]
# Store backend: sqlite or memory (nothing is kept on exit)
backend = "sqlite"

# SQLite database file
database_path = "~/.local/share/meterdb/meterdb.db"

[aggregation]
# Wall clock for year/month/week/day/hour/minute grouping: local or utc
timezone = "local"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/meterdb/meterdb.log"
"#
    .to_string()
}
