//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Configuration is loaded once at startup into an immutable [`Config`] value
//! and passed by reference into each component's constructor. There is no
//! runtime mutation and no ambient global lookup.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub ingest: IngestConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
    pub alerts: AlertThresholds,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Bounded read timeout for one frame; a timeout is not an error.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Minimum spacing between reconnect attempts after the port drops.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Ingestion loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Milliseconds between ingestion cycles.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

/// Storage and backup configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Attempts per row before a failed write degrades system health.
    #[serde(default = "default_write_retry_budget")]
    pub write_retry_budget: u32,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Seconds between database snapshots.
    #[serde(default = "default_backup_interval_s")]
    pub backup_interval_s: u64,

    #[serde(default = "default_max_backups_to_keep")]
    pub max_backups_to_keep: usize,
}

/// Log file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_file")]
    pub file: String,
}

/// Alert threshold table
#[derive(Debug, Deserialize, Clone)]
pub struct AlertThresholds {
    /// Battery voltage below this raises `battery_low` (volts).
    #[serde(default = "default_battery_low_volts")]
    pub battery_low_volts: f64,

    /// Temperature above this raises `temperature_high` (°C).
    #[serde(default = "default_temperature_high_c")]
    pub temperature_high_c: f64,

    /// A real detection closer than this raises `bird_proximity` (meters).
    #[serde(default = "default_bird_close_m")]
    pub bird_close_m: f64,

    /// Gate for `system_failure` alerts on a faulted drone.
    #[serde(default = "default_system_failure")]
    pub system_failure: bool,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_update_interval_ms() -> u64 { 1000 }

fn default_database_file() -> String { "telemetry.db".to_string() }
fn default_write_retry_budget() -> u32 { 3 }
fn default_backup_dir() -> String { "./backups".to_string() }
fn default_backup_interval_s() -> u64 { 3600 }
fn default_max_backups_to_keep() -> usize { 10 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_log_file() -> String { "bird-deterrent.log".to_string() }

fn default_battery_low_volts() -> f64 { 11.0 }
fn default_temperature_high_c() -> f64 { 60.0 }
fn default_bird_close_m() -> f64 { 10.0 }
fn default_system_failure() -> bool { true }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400].contains(&self.serial.baud_rate) {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400")
            ));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 10000 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("read_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        if self.ingest.update_interval_ms == 0 || self.ingest.update_interval_ms > 60000 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("update_interval_ms must be between 1 and 60000")
            ));
        }

        if self.storage.database_file.is_empty() {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("database_file cannot be empty")
            ));
        }

        if self.storage.write_retry_budget == 0 || self.storage.write_retry_budget > 10 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("write_retry_budget must be between 1 and 10")
            ));
        }

        if self.storage.backup_dir.is_empty() {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("backup_dir cannot be empty")
            ));
        }

        if self.storage.backup_interval_s == 0 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("backup_interval_s must be greater than 0")
            ));
        }

        if self.storage.max_backups_to_keep == 0 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("max_backups_to_keep must be greater than 0")
            ));
        }

        if self.log.dir.is_empty() || self.log.file.is_empty() {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("log dir and file cannot be empty")
            ));
        }

        if self.alerts.battery_low_volts <= 0.0 || self.alerts.battery_low_volts > 30.0 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("battery_low_volts must be between 0 and 30")
            ));
        }

        if self.alerts.temperature_high_c < -40.0 || self.alerts.temperature_high_c > 150.0 {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("temperature_high_c must be between -40 and 150")
            ));
        }

        if self.alerts.bird_close_m <= 0.0
            || self.alerts.bird_close_m >= crate::frame::protocol::NO_BIRD_DISTANCE_M
        {
            return Err(crate::error::GcsError::Config(
                toml::de::Error::custom("bird_close_m must be positive and below the no-detection distance")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            serial: SerialConfig {
                port: default_serial_port(),
                baud_rate: default_baud_rate(),
                read_timeout_ms: default_read_timeout_ms(),
                reconnect_interval_ms: default_reconnect_interval_ms(),
            },
            ingest: IngestConfig {
                update_interval_ms: default_update_interval_ms(),
            },
            storage: StorageConfig {
                database_file: default_database_file(),
                write_retry_budget: default_write_retry_budget(),
                backup_dir: default_backup_dir(),
                backup_interval_s: default_backup_interval_s(),
                max_backups_to_keep: default_max_backups_to_keep(),
            },
            log: LogConfig {
                dir: default_log_dir(),
                file: default_log_file(),
            },
            alerts: AlertThresholds {
                battery_low_volts: default_battery_low_volts(),
                temperature_high_c: default_temperature_high_c(),
                bird_close_m: default_bird_close_m(),
                system_failure: default_system_failure(),
            },
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyACM0"
baud_rate = 57600

[ingest]

[storage]
database_file = "gcs.db"

[log]

[alerts]
battery_low_volts = 10.5
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.storage.database_file, "gcs.db");
        assert!((config.alerts.battery_low_volts - 10.5).abs() < f64::EPSILON);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.ingest.update_interval_ms, 1000);
        assert_eq!(config.storage.backup_interval_s, 3600);
        assert!(config.alerts.system_failure);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(Config::load("/nonexistent/talon-gcs.toml").is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000; // Not a drone-link rate
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[9600, 19200, 38400, 57600, 115200, 230400] {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_read_timeout_zero() {
        let mut config = create_valid_config();
        config.serial.read_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_too_high() {
        let mut config = create_valid_config();
        config.serial.read_timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_zero() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_zero() {
        let mut config = create_valid_config();
        config.ingest.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database_file() {
        let mut config = create_valid_config();
        config.storage.database_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_retry_budget_bounds() {
        let mut config = create_valid_config();
        config.storage.write_retry_budget = 0;
        assert!(config.validate().is_err());
        config.storage.write_retry_budget = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backup_interval_zero() {
        let mut config = create_valid_config();
        config.storage.backup_interval_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_backups_zero() {
        let mut config = create_valid_config();
        config.storage.max_backups_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_battery_threshold_out_of_range() {
        let mut config = create_valid_config();
        config.alerts.battery_low_volts = 0.0;
        assert!(config.validate().is_err());
        config.alerts.battery_low_volts = 31.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bird_close_above_sentinel() {
        let mut config = create_valid_config();
        config.alerts.bird_close_m = 999.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_read_timeout_ms(), 1000);
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert_eq!(default_update_interval_ms(), 1000);
        assert_eq!(default_database_file(), "telemetry.db");
        assert_eq!(default_write_retry_budget(), 3);
        assert_eq!(default_backup_interval_s(), 3600);
        assert_eq!(default_max_backups_to_keep(), 10);
        assert_eq!(default_battery_low_volts(), 11.0);
        assert_eq!(default_temperature_high_c(), 60.0);
        assert_eq!(default_bird_close_m(), 10.0);
        assert!(default_system_failure());
    }
}
