//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::device::{DeviceLayout, DeviceSpec};
use crate::error::{PedalRelayError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub devices: DevicesConfig,

    #[serde(default)]
    pub virtual_device: VirtualDeviceConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Physical source devices
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DevicesConfig {
    pub pedals: String,

    /// Without a wheelbase the pedals-only layout is used
    #[serde(default)]
    pub wheelbase: Option<String>,
}

/// Overrides for the synthesized device; unset fields use the layout defaults
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct VirtualDeviceConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub vendor_id: Option<u16>,

    #[serde(default)]
    pub product_id: Option<u16>,

    #[serde(default)]
    pub version: Option<u16>,

    #[serde(default)]
    pub buttons: Option<u16>,
}

/// Relay loop timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// Startup calibration state
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// JSON preset applied before the relay starts
    #[serde(default)]
    pub preset: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily rolling log files are written here; empty means console only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_pedals() -> String { "/dev/input/js0".to_string() }

fn default_poll_interval_ms() -> u64 { 1 }
fn default_stop_timeout_ms() -> u64 { 2000 }

fn default_log_level() -> String { "info".to_string() }

/// Accepted values for `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound on placeholder buttons (BTN_JOYSTICK..BTN_JOYSTICK+31)
pub const MAX_BUTTONS: u16 = 32;

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            pedals: default_pedals(),
            wheelbase: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> PedalRelayError {
    PedalRelayError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pedal_relay::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Called by [`Config::load`]; call it again after applying command line
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.devices.pedals.is_empty() {
            return Err(invalid("devices.pedals cannot be empty"));
        }

        if let Some(wheelbase) = &self.devices.wheelbase {
            if wheelbase.is_empty() {
                return Err(invalid("devices.wheelbase cannot be empty when set"));
            }
            if *wheelbase == self.devices.pedals {
                return Err(invalid("devices.wheelbase and devices.pedals must differ"));
            }
        }

        if let Some(name) = &self.virtual_device.name {
            if name.trim().is_empty() {
                return Err(invalid("virtual_device.name cannot be blank"));
            }
        }

        if let Some(buttons) = self.virtual_device.buttons {
            if buttons == 0 || buttons > MAX_BUTTONS {
                return Err(invalid(format!(
                    "virtual_device.buttons must be between 1 and {}",
                    MAX_BUTTONS
                )));
            }
        }

        if self.relay.poll_interval_ms == 0 || self.relay.poll_interval_ms > 100 {
            return Err(invalid("poll_interval_ms must be between 1 and 100"));
        }

        if self.relay.stop_timeout_ms == 0 || self.relay.stop_timeout_ms > 10000 {
            return Err(invalid("stop_timeout_ms must be between 1 and 10000"));
        }

        if let Some(preset) = &self.calibration.preset {
            if preset.is_empty() {
                return Err(invalid("calibration.preset cannot be empty when set"));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Layout implied by the configured sources
    pub fn layout(&self) -> DeviceLayout {
        if self.devices.wheelbase.is_some() {
            DeviceLayout::Merged
        } else {
            DeviceLayout::PedalsOnly
        }
    }

    /// Layout defaults with the `[virtual_device]` overrides applied
    pub fn device_spec(&self) -> DeviceSpec {
        let mut spec = self.layout().default_spec();
        let overrides = &self.virtual_device;

        if let Some(name) = &overrides.name {
            spec.name = name.clone();
        }
        if let Some(vendor_id) = overrides.vendor_id {
            spec.vendor_id = vendor_id;
        }
        if let Some(product_id) = overrides.product_id {
            spec.product_id = product_id;
        }
        if let Some(version) = overrides.version {
            spec.version = version;
        }
        if let Some(buttons) = overrides.buttons {
            spec.buttons = buttons;
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            devices: DevicesConfig {
                pedals: "/dev/input/js1".to_string(),
                wheelbase: Some("/dev/input/js0".to_string()),
            },
            virtual_device: VirtualDeviceConfig::default(),
            relay: RelayConfig {
                poll_interval_ms: default_poll_interval_ms(),
                stop_timeout_ms: default_stop_timeout_ms(),
            },
            calibration: CalibrationConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                directory: String::new(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout(), DeviceLayout::PedalsOnly);
    }

    #[test]
    fn test_valid_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[devices]
pedals = "/dev/input/js2"
wheelbase = "/dev/input/js0"

[relay]
poll_interval_ms = 2

[calibration]
enabled = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.devices.pedals, "/dev/input/js2");
        assert_eq!(config.relay.poll_interval_ms, 2);
        assert_eq!(config.relay.stop_timeout_ms, 2000);
        assert!(config.calibration.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[devices]\npedals = \"/dev/input/js0\"\n\n[relay]\npoll_interval_ms = 0\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(PedalRelayError::Config(_))
        ));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
            .unwrap();
        assert_eq!(config.layout(), DeviceLayout::Merged);
        assert!(!config.calibration.enabled);
    }

    #[test]
    fn test_pedals_are_required() {
        let result: std::result::Result<Config, _> = toml::from_str("[relay]\npoll_interval_ms = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/pedal-relay.toml");
        assert!(matches!(result, Err(PedalRelayError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[devices\npedals = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(PedalRelayError::Config(_))
        ));
    }

    #[test]
    fn test_empty_pedals() {
        let mut config = create_valid_config();
        config.devices.pedals = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_wheelbase() {
        let mut config = create_valid_config();
        config.devices.wheelbase = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wheelbase_same_as_pedals() {
        let mut config = create_valid_config();
        config.devices.wheelbase = Some(config.devices.pedals.clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_device_name() {
        let mut config = create_valid_config();
        config.virtual_device.name = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buttons_zero() {
        let mut config = create_valid_config();
        config.virtual_device.buttons = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buttons_too_many() {
        let mut config = create_valid_config();
        config.virtual_device.buttons = Some(33);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buttons_at_limit() {
        let mut config = create_valid_config();
        config.virtual_device.buttons = Some(32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = create_valid_config();
        config.relay.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_too_high() {
        let mut config = create_valid_config();
        config.relay.poll_interval_ms = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stop_timeout_zero() {
        let mut config = create_valid_config();
        config.relay.stop_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stop_timeout_too_high() {
        let mut config = create_valid_config();
        config.relay.stop_timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_preset_path() {
        let mut config = create_valid_config();
        config.calibration.preset = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_layout_follows_wheelbase() {
        let mut config = create_valid_config();
        assert_eq!(config.layout(), DeviceLayout::Merged);
        assert_eq!(config.device_spec().product_id, 0x6011);

        config.devices.wheelbase = None;
        assert_eq!(config.layout(), DeviceLayout::PedalsOnly);
        assert_eq!(config.device_spec().product_id, 0x6012);
    }

    #[test]
    fn test_device_spec_overrides() {
        let mut config = create_valid_config();
        config.virtual_device = VirtualDeviceConfig {
            name: Some("Rig".to_string()),
            vendor_id: Some(0x1234),
            product_id: None,
            version: Some(7),
            buttons: Some(8),
        };

        let spec = config.device_spec();
        assert_eq!(spec.name, "Rig");
        assert_eq!(spec.vendor_id, 0x1234);
        assert_eq!(spec.product_id, 0x6011);
        assert_eq!(spec.version, 7);
        assert_eq!(spec.buttons, 8);
        assert_eq!(spec.layout, DeviceLayout::Merged);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_pedals(), "/dev/input/js0");
        assert_eq!(default_poll_interval_ms(), 1);
        assert_eq!(default_stop_timeout_ms(), 2000);
        assert_eq!(default_log_level(), "info");
    }
}
