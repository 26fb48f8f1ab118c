//! Configuration management for roboarm.
//!
//! Configuration comes from an optional TOML file, then environment
//! variables, then command-line arguments (applied by the binary). Every
//! field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// USB serial number of the bridge the arm ships with.
pub const DEFAULT_SERIAL_NUMBER: &str = "AH02QXEY";

/// Time the device is given to answer before its queue is read.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

const ENV_SERIAL: &str = "ROBOARM_SERIAL";
const ENV_SETTLE_MS: &str = "ROBOARM_SETTLE_MS";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Device selection and timing
    pub device: DeviceConfig,
}

/// Which device to open and how long to wait for its replies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB serial number of the serial bridge
    pub serial_number: String,

    /// Delay between writing a command and reading the reply
    pub settle_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial_number: DEFAULT_SERIAL_NUMBER.to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl DeviceConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Config {
    /// Defaults overlaid with environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file, then overlay the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::parse(&text)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(serial) = lookup(ENV_SERIAL) {
            self.device.serial_number = serial;
        }
        if let Some(settle) = lookup(ENV_SETTLE_MS) {
            self.device.settle_delay_ms = settle.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be milliseconds, got {:?}", ENV_SETTLE_MS, settle))
            })?;
        }
        Ok(())
    }
}
