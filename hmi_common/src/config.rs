//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all HMI tag exchange applications, plus the tag exchange
//! configuration itself ([`TagExchangeConfig`]).
//!
//! # Usage
//!
//! ```rust,no_run
//! use hmi_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//!     port: u16,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyAppConfig::load(Path::new("config.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::schema::{TagSpec, VariableSchema};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
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
/// Represents the verbosity level of logging output.
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Common configuration fields shared across all HMI applications.
///
/// This struct should be embedded in application-specific configuration
/// structs to provide consistent base configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "hmi-tag-exchange-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// How long a slot spinlock acquisition may spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Spin until the lock is free.
    #[default]
    Unbounded,
    /// Give up after this many failed attempts.
    Spins(u64),
    /// Give up once this much time has elapsed.
    Timeout(Duration),
}

/// Shared region settings.
///
/// # TOML Example
///
/// ```toml
/// [region]
/// name = "/hmi_tags"
/// sync_mode = true
/// lock_timeout_ms = 50
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Name of the externally created shared memory object.
    pub name: String,

    /// Reserve a region-wide sync flag at offset 0.
    #[serde(default)]
    pub sync_mode: bool,

    /// Bound slot lock acquisition by attempt count.
    #[serde(default)]
    pub max_spins: Option<u64>,

    /// Bound slot lock acquisition by wall-clock time.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
}

impl RegionConfig {
    /// Lock policy selected by the configuration.
    ///
    /// A timeout takes precedence over a spin count.
    pub fn lock_policy(&self) -> LockPolicy {
        match (self.lock_timeout_ms, self.max_spins) {
            (Some(ms), _) => LockPolicy::Timeout(Duration::from_millis(ms)),
            (None, Some(spins)) => LockPolicy::Spins(spins),
            (None, None) => LockPolicy::Unbounded,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `name` is empty or contains `/` anywhere but the first character
    /// - `max_spins` or `lock_timeout_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bare = self.name.strip_prefix('/').unwrap_or(&self.name);
        if bare.is_empty() {
            return Err(ConfigError::ValidationError(
                "region.name cannot be empty".to_string(),
            ));
        }
        if bare.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "region.name '{}' may only contain a leading '/'",
                self.name
            )));
        }
        if self.max_spins == Some(0) {
            return Err(ConfigError::ValidationError(
                "region.max_spins must be greater than 0".to_string(),
            ));
        }
        if self.lock_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "region.lock_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a tag exchange process.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "hmi-tag-exchange"
///
/// [region]
/// name = "/hmi_tags"
///
/// [[tags]]
/// id = 1
/// name = "motor_run"
/// type = "bool"
///
/// [[tags]]
/// id = 2
/// name = "banner"
/// type = "string"
/// size = 64
/// value = "idle"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagExchangeConfig {
    /// Common application settings.
    pub shared: SharedConfig,

    /// Shared region settings.
    pub region: RegionConfig,

    /// Tag list in region order.
    #[serde(default)]
    pub tags: Vec<TagSpec>,
}

impl TagExchangeConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if any section is invalid, the
    /// tag list is empty or the declared sizes overflow the layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.region.validate()?;
        if self.tags.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[tags]] entry is required".to_string(),
            ));
        }
        self.schema()
            .layout(self.region.sync_mode)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(())
    }

    /// Build the region schema from the tag list.
    pub fn schema(&self) -> VariableSchema {
        VariableSchema::from_specs(self.region.name.clone(), &self.tags)
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Returns `ConfigError::ValidationError` if semantic validation fails
///
/// # Example
///
/// ```rust,no_run
/// use hmi_common::config::{ConfigLoader, SharedConfig, ConfigError};
/// use serde::Deserialize;
/// use std::path::Path;
///
/// #[derive(Debug, Deserialize)]
/// struct AppConfig {
///     shared: SharedConfig,
/// }
///
/// fn main() -> Result<(), ConfigError> {
///     let config = AppConfig::load(Path::new("config.toml"))?;
///     Ok(())
/// }
/// ```
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - Successfully loaded and parsed configuration
    /// * `Err(ConfigError)` - Loading or parsing failed
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
// This allows any serde-deserializable struct to use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_from_toml() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }

        let parsed: Wrapper = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(parsed.level, LogLevel::Warn);
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(toml::from_str::<Wrapper>("level = \"loud\"").is_err());
    }

    #[test]
    fn test_log_level_maps_to_tracing_level() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_shared_config_requires_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Debug,
            service_name: String::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    const TAG_CONFIG: &str = r#"
[shared]
service_name = "hmi-test"

[region]
name = "/hmi_tags"
sync_mode = true
max_spins = 1000

[[tags]]
id = 1
name = "run"
type = "bool"
value = "true"

[[tags]]
id = 2
name = "freq"
type = "double"

[[tags]]
id = 3
name = "banner"
type = "string"
size = 32
value = "idle"
"#;

    fn region(name: &str) -> RegionConfig {
        RegionConfig {
            name: name.to_string(),
            sync_mode: false,
            max_spins: None,
            lock_timeout_ms: None,
        }
    }

    #[test]
    fn test_tag_exchange_config_load() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{TAG_CONFIG}").unwrap();
        file.flush().unwrap();

        let config = TagExchangeConfig::load(file.path()).unwrap();
        config.validate().unwrap();
        assert!(config.region.sync_mode);
        assert_eq!(config.region.lock_policy(), LockPolicy::Spins(1000));
        assert_eq!(config.tags.len(), 3);
        assert_eq!(config.tags[1].tag_type, crate::value::TagType::Float64);

        let schema = config.schema();
        assert_eq!(schema.region_name(), "/hmi_tags");
        assert_eq!(schema.tags()[2].size, 32);
    }

    #[test]
    fn test_lock_policy_selection() {
        let mut cfg = region("/r");
        assert_eq!(cfg.lock_policy(), LockPolicy::Unbounded);
        cfg.max_spins = Some(10);
        assert_eq!(cfg.lock_policy(), LockPolicy::Spins(10));
        cfg.lock_timeout_ms = Some(5);
        assert_eq!(
            cfg.lock_policy(),
            LockPolicy::Timeout(Duration::from_millis(5))
        );
    }

    #[test]
    fn test_region_name_validation() {
        assert!(region("/hmi").validate().is_ok());
        assert!(region("hmi").validate().is_ok());
        assert!(matches!(
            region("/").validate(),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            region("/a/b").validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut cfg = region("/hmi");
        cfg.lock_timeout_ms = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_tag_list_rejected() {
        let config = TagExchangeConfig {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "svc".to_string(),
            },
            region: region("/hmi"),
            tags: Vec::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
