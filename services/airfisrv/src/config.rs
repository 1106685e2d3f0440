//! airfisrv configuration
//!
//! Loaded in layers: built-in defaults, then the YAML file, then
//! `AIRFISRV_` environment variables (`__` separates nested keys, e.g.
//! `AIRFISRV_SYNC__INTERVAL_MS=500`).

use std::path::Path;
use std::time::Duration;

use airfi_modbus::{ClientParams, DEFAULT_TIMEOUT, DEFAULT_UNIT_ID};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::engine::SyncSettings;
use crate::error::{AirfiError, Result};
use crate::features::{Feature, FeatureFlags};
use crate::negotiator::CapabilityTable;

pub const DEFAULT_CONFIG_PATH: &str = "config/airfisrv.yaml";
pub const ENV_PREFIX: &str = "AIRFISRV_";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirfiConfig {
    /// Platform name
    pub name: String,
    pub language: Language,
    pub log: LogConfig,
    pub debug: DebugConfig,
    pub sync: SyncConfig,
    /// Replaces the built-in capability tables when set
    pub capabilities: Option<CapabilityTable>,
    pub devices: Vec<DeviceConfig>,
}

impl Default for AirfiConfig {
    fn default() -> Self {
        Self {
            name: "Airfi".to_string(),
            language: Language::default(),
            log: LogConfig::default(),
            debug: DebugConfig::default(),
            sync: SyncConfig::default(),
            capabilities: None,
            devices: Vec::new(),
        }
    }
}

/// UI language passed through to the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fi,
    Sv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// EnvFilter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log every bank read as an address → value map
    pub print_modbus_map: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_ms: u64,
    pub read_frequency: u8,
    pub restart_cooldown_secs: u64,
    pub io_timeout_ms: u64,
    pub unit_id: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let defaults = SyncSettings::default();
        Self {
            interval_ms: defaults.interval.as_millis() as u64,
            read_frequency: defaults.read_frequency,
            restart_cooldown_secs: defaults.restart_cooldown.as_secs(),
            io_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            unit_id: DEFAULT_UNIT_ID,
        }
    }
}

impl SyncConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn settings(&self, debug: &DebugConfig) -> SyncSettings {
        SyncSettings {
            interval: Duration::from_millis(self.interval_ms),
            read_frequency: self.read_frequency,
            restart_cooldown: Duration::from_secs(self.restart_cooldown_secs),
            print_modbus_map: debug.print_modbus_map,
        }
    }
}

/// One air handling unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub expose_fireplace_function_switch: bool,
    pub expose_boosted_cooling_switch: bool,
    pub expose_sauna_function_switch: bool,
}

impl DeviceConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Airfi")
    }

    /// Required parameters that are absent or empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |s| s.trim().is_empty())
        }

        let mut missing = Vec::new();
        if blank(&self.host) {
            missing.push("host");
        }
        if self.port.map_or(true, |port| port == 0) {
            missing.push("port");
        }
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.model) {
            missing.push("model");
        }
        if blank(&self.serial_number) {
            missing.push("serialNumber");
        }
        missing
    }

    /// Connection parameters for the Modbus client
    pub fn client_params(&self, sync: &SyncConfig) -> Result<ClientParams> {
        let host = self
            .host
            .clone()
            .ok_or_else(|| AirfiError::config("Missing required config parameter: host"))?;
        let port = self
            .port
            .ok_or_else(|| AirfiError::config("Missing required config parameter: port"))?;
        Ok(ClientParams::new(host, port)
            .with_unit_id(sync.unit_id)
            .with_timeout(sync.io_timeout()))
    }

    fn switch_toggled(&self, feature: Feature) -> bool {
        match feature {
            Feature::FireplaceFunction => self.expose_fireplace_function_switch,
            Feature::BoostedCooling => self.expose_boosted_cooling_switch,
            Feature::SaunaFunction => self.expose_sauna_function_switch,
            Feature::MinimumTemperatureSet => false,
        }
    }

    /// Switches to expose: the unit has the feature and the user asked for it
    pub fn exposed_switches(&self, features: &FeatureFlags) -> Vec<Feature> {
        features
            .iter()
            .filter(|feature| self.switch_toggled(*feature))
            .collect()
    }
}

impl AirfiConfig {
    /// Load from `path` (or the default location) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let figment = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AirfiConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Capability tables in effect
    pub fn capability_table(&self) -> CapabilityTable {
        self.capabilities.clone().unwrap_or_default()
    }

    /// Report every missing parameter, then fail if there was any
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.devices.is_empty() {
            problems.push("No devices configured".to_string());
        }
        for (index, device) in self.devices.iter().enumerate() {
            for field in device.missing_fields() {
                error!("Missing required config parameter: {} (device #{})", field, index + 1);
                problems.push(format!("device #{}: missing {}", index + 1, field));
            }
        }

        if self.sync.interval_ms == 0 {
            problems.push("sync.interval_ms must be greater than 0".to_string());
        }
        if self.sync.read_frequency == 0 {
            problems.push("sync.read_frequency must be at least 1".to_string());
        }
        if let Some(table) = &self.capabilities {
            if let Err(e) = table.validate() {
                problems.push(e.to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AirfiError::Config(problems.join("; ")))
        }
    }
}
