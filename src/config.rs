use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Default tracing filter, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            registry: RegistryConfig::default(),
            actuator: ActuatorConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ============================================================================
// Registry Config
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// TOML file holding the device list
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,

    /// Write the default devices when the store is empty
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            seed_defaults: default_seed_defaults(),
        }
    }
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("devices.toml")
}

fn default_seed_defaults() -> bool {
    true
}

// ============================================================================
// Actuator Config
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
pub struct ActuatorConfig {
    /// Percent travelled per simulation tick
    #[serde(default = "default_step")]
    pub step: u8,

    /// Simulation tick period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Position reported for devices that have never moved
    #[serde(default = "default_initial_position")]
    pub initial_position: u8,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            tick_ms: default_tick_ms(),
            initial_position: default_initial_position(),
        }
    }
}

fn default_step() -> u8 {
    5
}

fn default_tick_ms() -> u64 {
    200
}

fn default_initial_position() -> u8 {
    50
}

// ============================================================================
// UI Config
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Print provisional transcripts while listening
    #[serde(default = "default_show_interim")]
    pub show_interim: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_interim: default_show_interim(),
        }
    }
}

fn default_show_interim() -> bool {
    true
}

impl Config {
    /// Missing file means defaults; a file that does not parse is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.actuator.step == 0 || self.actuator.step > 100 {
            return Err(Error::Config(format!(
                "actuator.step must be within 1..=100, got {}",
                self.actuator.step
            )));
        }
        if self.actuator.initial_position > 100 {
            return Err(Error::Config(format!(
                "actuator.initial_position must be within 0..=100, got {}",
                self.actuator.initial_position
            )));
        }
        if self.actuator.tick_ms == 0 {
            return Err(Error::Config("actuator.tick_ms must be positive".into()));
        }
        Ok(())
    }
}
