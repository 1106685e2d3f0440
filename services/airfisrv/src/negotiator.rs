//! Capability negotiation
//!
//! Reads the probe region (hardware revision, firmware version, Modbus map
//! version) over a short-lived session and decides bank sizes and features.
//! Version thresholds live in [`CapabilityTable`], which is plain data so new
//! firmware releases only need a table change.

use airfi_modbus::{decode_version, ModbusLinkError, RegisterBank, RegisterTransport};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AirfiError, Result};
use crate::features::{Feature, FeatureFlags};

/// Number of input registers read by the probe
pub const PROBE_LENGTH: u16 = 3;

/// Bank sizes for one map version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLengths {
    pub input: u16,
    pub holding: u16,
}

/// Table row: banks of at least `version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthThreshold {
    pub version: Version,
    pub input: u16,
    pub holding: u16,
}

/// Table row: feature available from `since`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureThreshold {
    pub feature: Feature,
    pub since: Version,
}

/// Versioned capability data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    pub minimum_map_version: Version,
    /// Exact firmware versions known to ship a broken register map
    #[serde(default)]
    pub denylisted_firmware: Vec<String>,
    pub register_lengths: Vec<LengthThreshold>,
    #[serde(default)]
    pub features: Vec<FeatureThreshold>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let lengths = [
            ((2, 7, 0), 42, 59),
            ((2, 5, 0), 40, 58),
            ((2, 3, 0), 40, 55),
            ((2, 1, 0), 40, 51),
            ((2, 0, 0), 40, 34),
            ((1, 5, 0), 31, 12),
        ];
        let features = [
            (Feature::MinimumTemperatureSet, (2, 1, 0)),
            (Feature::FireplaceFunction, (2, 5, 0)),
            (Feature::BoostedCooling, (2, 5, 0)),
            (Feature::SaunaFunction, (2, 5, 0)),
        ];

        Self {
            minimum_map_version: Version::new(1, 5, 0),
            // 3.2.0 exposes a hidden register that shifts the map
            denylisted_firmware: vec!["3.2.0".to_string()],
            register_lengths: lengths
                .into_iter()
                .map(|((major, minor, patch), input, holding)| LengthThreshold {
                    version: Version::new(major, minor, patch),
                    input,
                    holding,
                })
                .collect(),
            features: features
                .into_iter()
                .map(|(feature, (major, minor, patch))| FeatureThreshold {
                    feature,
                    since: Version::new(major, minor, patch),
                })
                .collect(),
        }
    }
}

impl CapabilityTable {
    /// Sanity checks for tables loaded from configuration
    pub fn validate(&self) -> Result<()> {
        if self.register_lengths.is_empty() {
            return Err(AirfiError::config(
                "capabilities.register_lengths must not be empty",
            ));
        }
        if !self
            .register_lengths
            .iter()
            .any(|row| row.version <= self.minimum_map_version)
        {
            return Err(AirfiError::config(format!(
                "capabilities.register_lengths has no entry for minimum map version {}",
                self.minimum_map_version
            )));
        }
        if self
            .register_lengths
            .iter()
            .any(|row| row.input == 0 || row.holding == 0)
        {
            return Err(AirfiError::config(
                "capabilities.register_lengths entries must be non-zero",
            ));
        }
        Ok(())
    }

    /// Reject versions the engine cannot drive
    pub fn check_supported(&self, map_version: &Version, firmware: &str) -> Result<()> {
        if *map_version < self.minimum_map_version {
            return Err(AirfiError::UnsupportedVersion {
                firmware: firmware.to_string(),
                map_version: map_version.to_string(),
            });
        }
        if self.denylisted_firmware.iter().any(|bad| bad == firmware) {
            return Err(AirfiError::DenylistedFirmware(firmware.to_string()));
        }
        Ok(())
    }

    pub fn is_supported(&self, map_version: &Version, firmware: &str) -> bool {
        self.check_supported(map_version, firmware).is_ok()
    }

    /// Lengths of the highest threshold not above `map_version`
    pub fn derive_register_lengths(&self, map_version: &Version) -> RegisterLengths {
        let applicable = self
            .register_lengths
            .iter()
            .filter(|row| row.version <= *map_version)
            .max_by(|a, b| a.version.cmp(&b.version));

        // Fall back to the smallest banks
        let row = applicable.or_else(|| {
            self.register_lengths
                .iter()
                .min_by(|a, b| a.version.cmp(&b.version))
        });

        match row {
            Some(row) => {
                debug!(
                    "Setting input register length to {} and holding register length to {}",
                    row.input, row.holding
                );
                RegisterLengths {
                    input: row.input,
                    holding: row.holding,
                }
            },
            None => RegisterLengths {
                input: PROBE_LENGTH,
                holding: 0,
            },
        }
    }

    pub fn derive_feature_flags(&self, map_version: &Version) -> FeatureFlags {
        self.features
            .iter()
            .filter(|threshold| threshold.since <= *map_version)
            .map(|threshold| threshold.feature)
            .collect()
    }
}

/// Raw probe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub firmware_version: String,
    pub map_version: String,
    /// Input registers 1..=3 as read
    pub input_sample: Vec<u16>,
}

impl ProbeResult {
    /// Build from an input register sample; fewer than three values means
    /// the unit returned no usable data
    pub fn from_sample(input_sample: Vec<u16>) -> Result<Self> {
        if input_sample.len() < PROBE_LENGTH as usize {
            return Err(AirfiError::NoDeviceData);
        }
        Ok(Self {
            firmware_version: decode_version(input_sample[1]),
            map_version: decode_version(input_sample[2]),
            input_sample,
        })
    }

    pub fn hardware_revision(&self) -> String {
        decode_version(self.input_sample[0])
    }
}

/// Outcome of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub hardware_revision: String,
    pub firmware_version: String,
    pub map_version: Version,
    pub register_lengths: RegisterLengths,
    pub features: FeatureFlags,
}

/// Capability negotiator for one device
#[derive(Debug, Clone, Default)]
pub struct Negotiator {
    table: CapabilityTable,
}

impl Negotiator {
    pub fn new(table: CapabilityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    /// Read the probe region over its own session
    pub async fn probe(&self, transport: &dyn RegisterTransport) -> Result<ProbeResult> {
        transport.open().await.map_err(|source| AirfiError::Connection {
            target: "air handling unit".to_string(),
            source,
        })?;

        let sample = transport
            .read_block(RegisterBank::Input, 1, PROBE_LENGTH)
            .await;
        transport.close().await;

        match sample {
            Ok(values) => ProbeResult::from_sample(values),
            Err(ModbusLinkError::ShortRead { .. }) => Err(AirfiError::NoDeviceData),
            Err(e) => Err(AirfiError::Read(e)),
        }
    }

    /// Decide bank sizes and features from a probe result
    pub fn negotiate(&self, probe: &ProbeResult) -> Result<DeviceProfile> {
        let map_version = Version::parse(&probe.map_version).map_err(|_| {
            AirfiError::UnsupportedVersion {
                firmware: probe.firmware_version.clone(),
                map_version: probe.map_version.clone(),
            }
        })?;

        self.table
            .check_supported(&map_version, &probe.firmware_version)?;

        Ok(DeviceProfile {
            hardware_revision: probe.hardware_revision(),
            firmware_version: probe.firmware_version.clone(),
            register_lengths: self.table.derive_register_lengths(&map_version),
            features: self.table.derive_feature_flags(&map_version),
            map_version,
        })
    }
}
