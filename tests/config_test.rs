//! Tests for configuration defaults, validation and file loading

use std::fs;

use tempfile::TempDir;
use walletcare::config::{AppConfig, DatabaseConfig};

#[test]
fn test_default_database_config() {
    let config = AppConfig::default();

    assert_eq!(config.database.path, "data/walletcare.db");
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.database.connection_timeout_secs, 30);
    assert_eq!(config.database.busy_timeout_ms, 5000);
}

#[test]
fn test_default_logging_and_images_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
    assert_eq!(config.images.directory, "data/images");
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_database_config_for_path() {
    let config = DatabaseConfig::for_path("/tmp/other.db");

    assert_eq!(config.path, "/tmp/other.db");
    assert_eq!(config.max_connections, 4);
}

#[test]
fn test_config_validation_empty_path() {
    let mut config = AppConfig::default();
    config.database.path = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_connections() {
    let mut config = AppConfig::default();
    config.database.max_connections = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_timeout() {
    let mut config = AppConfig::default();
    config.database.connection_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_config_validation_all_log_levels() {
    for level in ["trace", "debug", "info", "warn", "error"] {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "rejected {level}");
    }
}

#[test]
fn test_config_validation_invalid_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());

    config.logging.format = "json".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_empty_image_directory() {
    let mut config = AppConfig::default();
    config.images.directory = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_partial_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("walletcare.toml");
    fs::write(
        &file,
        "[database]\npath = \"/var/lib/walletcare/health.db\"\n\n[logging]\nformat = \"json\"\n",
    )
    .unwrap();

    let config = AppConfig::load_from(&file).unwrap();

    assert_eq!(config.database.path, "/var/lib/walletcare/health.db");
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.images.directory, "data/images");
}

#[test]
fn test_load_from_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("walletcare.toml");
    fs::write(&file, "[database]\nmax_connections = 0\n").unwrap();

    assert!(AppConfig::load_from(&file).is_err());
}

#[test]
fn test_load_from_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    assert!(AppConfig::load_from(&dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_config_clone() {
    let config = AppConfig::default();
    let cloned = config.clone();

    assert_eq!(config.database.path, cloned.database.path);
    assert_eq!(config.images.directory, cloned.images.directory);
}
