//! Configuration loading traits and types.
//!
//! Board configuration is a single TOML file. Every section is optional;
//! missing sections fall back to the defaults below.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "galileo-bench-01"
//!
//! [board]
//! binding = "sysfs"
//! platform = "galileo-gen2"
//! sampling_interval_ms = 20
//!
//! [i2c]
//! bus = 0
//! delay_ms = 5
//! handles = "per-address"
//!
//! [servo]
//! min_us = 1000
//! max_us = 2000
//!
//! [report]
//! digital = [2, 7]
//! analog = ["A0"]
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use galileo_common::config::{BoardConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BoardConfig::from_file(Path::new("board.toml"))?;
//!     println!("Binding: {}", config.board.binding);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_I2C_DELAY_MS, DEFAULT_SAMPLING_INTERVAL_MS, DEFAULT_SERVICE_NAME,
    DEFAULT_SERVO_MAX_US, DEFAULT_SERVO_MIN_US, MAX_SAMPLING_INTERVAL_MS,
};
use crate::io::PinId;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── [board] ────────────────────────────────────────────────────────

/// Binding selection and engine timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSection {
    /// Name of the binding in the registry.
    pub binding: String,
    /// Forces a platform profile instead of asking the binding.
    pub platform: Option<Platform>,
    /// Sampling loop period in milliseconds.
    pub sampling_interval_ms: u32,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            binding: "simulation".to_string(),
            platform: None,
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
        }
    }
}

// ─── [i2c] ──────────────────────────────────────────────────────────

/// How I2C bus contexts are shared between device addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum I2cHandleMode {
    /// One context for every address; the address is reselected per transfer.
    #[default]
    Shared,
    /// One context per device address.
    PerAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cSection {
    /// Bus number; `None` uses the platform default.
    pub bus: Option<u8>,
    /// Delay between continuous reads, and before one-shot reads.
    pub delay_ms: u32,
    pub handles: I2cHandleMode,
}

impl Default for I2cSection {
    fn default() -> Self {
        Self {
            bus: None,
            delay_ms: DEFAULT_I2C_DELAY_MS,
            handles: I2cHandleMode::Shared,
        }
    }
}

// ─── [servo] ────────────────────────────────────────────────────────

/// Default servo pulse range applied to pins without `servo_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoSection {
    pub min_us: u32,
    pub max_us: u32,
}

impl Default for ServoSection {
    fn default() -> Self {
        Self {
            min_us: DEFAULT_SERVO_MIN_US,
            max_us: DEFAULT_SERVO_MAX_US,
        }
    }
}

// ─── [report] ───────────────────────────────────────────────────────

/// Pins the runner registers for reporting at startup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub digital: Vec<PinId>,
    pub analog: Vec<PinId>,
}

// ─── [simulation] ───────────────────────────────────────────────────

/// Identity reported by the simulation binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub platform_type: u32,
    pub pin_count: u32,
    pub default_i2c_bus: u8,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            platform_type: 1,
            pin_count: 20,
            default_i2c_bus: 0,
        }
    }
}

// ─── [sysfs] ────────────────────────────────────────────────────────

/// Settings for the Linux sysfs binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysfsSection {
    /// Mount point of sysfs.
    pub root: PathBuf,
    /// Forces the platform id. Unset, it follows the DMI board name.
    pub platform_type: Option<u32>,
    pub pin_count: u32,
}

impl Default for SysfsSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sys"),
            platform_type: None,
            pin_count: 20,
        }
    }
}

// ─── Board configuration ────────────────────────────────────────────

/// Complete board configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub shared: SharedConfig,
    pub board: BoardSection,
    pub i2c: I2cSection,
    pub servo: ServoSection,
    pub report: ReportSection,
    pub simulation: SimulationSection,
    pub sysfs: SysfsSection,
}

impl BoardConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - `servo.min_us >= servo.max_us`
    /// - `board.sampling_interval_ms` exceeds 65535
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.servo.min_us >= self.servo.max_us {
            return Err(ConfigError::ValidationError(format!(
                "servo.min_us ({}) must be below servo.max_us ({})",
                self.servo.min_us, self.servo.max_us
            )));
        }

        if self.board.sampling_interval_ms > MAX_SAMPLING_INTERVAL_MS {
            return Err(ConfigError::ValidationError(format!(
                "board.sampling_interval_ms ({}) exceeds {}",
                self.board.sampling_interval_ms, MAX_SAMPLING_INTERVAL_MS
            )));
        }

        if self.board.binding.is_empty() {
            return Err(ConfigError::ValidationError(
                "board.binding cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"error\"")
                .unwrap()
                .level,
            LogLevel::Error
        );
    }

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.shared.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.board.binding, "simulation");
        assert_eq!(config.board.sampling_interval_ms, 10);
        assert_eq!(config.i2c.delay_ms, 5);
        assert_eq!(config.i2c.handles, I2cHandleMode::Shared);
        assert_eq!(config.servo.min_us, 600);
        assert_eq!(config.servo.max_us, 2600);
        assert_eq!(config.sysfs.root, PathBuf::from("/sys"));
        assert_eq!(config.sysfs.platform_type, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let mut config = BoardConfig::default();
        config.shared.service_name.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_servo_range_validation() {
        let mut config = BoardConfig::default();
        config.servo.min_us = 2000;
        config.servo.max_us = 2000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("servo.min_us"));
    }

    #[test]
    fn test_sampling_interval_validation() {
        let mut config = BoardConfig::default();
        config.board.sampling_interval_ms = 70_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = BoardConfig::load(Path::new("/nonexistent/path/board.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = BoardConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_full_config_roundtrip_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"
service_name = "bench-01"

[board]
binding = "sysfs"
platform = "edison-miniboard"
sampling_interval_ms = 25

[i2c]
bus = 6
handles = "per-address"

[servo]
min_us = 1000
max_us = 2000

[report]
digital = [2, "J17-1"]
analog = ["A0", 1]
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = BoardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.board.binding, "sysfs");
        assert_eq!(config.board.platform, Some(Platform::EdisonMiniboard));
        assert_eq!(config.board.sampling_interval_ms, 25);
        assert_eq!(config.i2c.bus, Some(6));
        assert_eq!(config.i2c.delay_ms, 5);
        assert_eq!(config.i2c.handles, I2cHandleMode::PerAddress);
        assert_eq!(config.servo.min_us, 1000);
        assert_eq!(
            config.report.digital,
            vec![PinId::Number(2), PinId::Name("J17-1".into())]
        );
        assert_eq!(
            config.report.analog,
            vec![PinId::Name("A0".into()), PinId::Number(1)]
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.simulation, SimulationSection::default());
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[servo]\nmin_us = 3000\n").unwrap();
        file.flush().unwrap();

        let result = BoardConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
