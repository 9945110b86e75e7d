use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database file and pool settings
    pub database: DatabaseConfig,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Decoded image settings
    pub images: ImageConfig,
}

/// Database file and pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite file
    pub path: String,
    /// Upper bound of pooled connections
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub connection_timeout_secs: u64,
    /// How long SQLite waits on a locked file before failing
    pub busy_timeout_ms: u64,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file; rotated daily
    pub file_path: Option<String>,
    /// "json" or "text"
    pub format: String,
}

/// Decoded image settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Directory decoded images are written to
    pub directory: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            images: ImageConfig {
                directory: "data/images".to_string(),
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/walletcare.db".to_string(),
            max_connections: 4,
            connection_timeout_secs: 30,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    /// Defaults pointing at the given file
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("WALLETCARE")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::finish(builder.build())
    }

    /// Load defaults overridden by one explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path));

        Self::finish(builder.build())
    }

    fn finish(built: std::result::Result<Config, config::ConfigError>) -> Result<Self> {
        let config = built.map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.images.directory.trim().is_empty() {
            return Err(anyhow::anyhow!("images.directory must not be empty"));
        }

        Ok(())
    }
}
