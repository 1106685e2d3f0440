//! Well-known registers of the Airfi controller

use std::fmt;

use airfi_modbus::{decode_temperature, decode_version, encode_temperature, RegisterAddress};
use serde::Serialize;

use crate::features::{Feature, FeatureFlags};

/// How a raw register value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Tenths of a degree, negatives wrapped
    Temperature,
    /// Dotted version packed as decimal digits
    Version,
    /// Whole degrees, written as-is
    Celsius,
    Percent,
    /// 0 / 1
    Switch,
    Raw,
}

/// One catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub key: &'static str,
    pub address: RegisterAddress,
    pub kind: ValueKind,
    /// Only present on units with this feature
    pub feature: Option<Feature>,
}

impl RegisterInfo {
    const fn input(key: &'static str, offset: u16, kind: ValueKind) -> Self {
        Self {
            key,
            address: RegisterAddress::input(offset),
            kind,
            feature: None,
        }
    }

    const fn holding(key: &'static str, offset: u16, kind: ValueKind) -> Self {
        Self {
            key,
            address: RegisterAddress::holding(offset),
            kind,
            feature: None,
        }
    }

    const fn gated(self, feature: Feature) -> Self {
        Self {
            feature: Some(feature),
            ..self
        }
    }

    pub fn is_available(&self, features: &FeatureFlags) -> bool {
        self.feature.map_or(true, |feature| features.has(feature))
    }

    /// Interpret a raw value
    pub fn decode(&self, raw: u16) -> DecodedValue {
        match self.kind {
            ValueKind::Temperature => DecodedValue::Number(decode_temperature(raw)),
            ValueKind::Version => DecodedValue::Text(decode_version(raw)),
            ValueKind::Switch => DecodedValue::Flag(raw != 0),
            ValueKind::Celsius | ValueKind::Percent | ValueKind::Raw => {
                DecodedValue::Number(f64::from(raw))
            },
        }
    }
}

impl RegisterInfo {
    /// Raw register value for a write; `None` for read-only kinds
    pub fn encode(&self, value: f64) -> Option<u16> {
        match self.kind {
            ValueKind::Temperature => Some(encode_temperature(value)),
            ValueKind::Celsius | ValueKind::Percent | ValueKind::Raw => {
                Some(value.round().clamp(0.0, f64::from(u16::MAX)) as u16)
            },
            ValueKind::Switch => Some(u16::from(value != 0.0)),
            ValueKind::Version => None,
        }
    }
}

/// Human-readable register value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Number(n) => write!(f, "{n}"),
            DecodedValue::Text(s) => f.write_str(s),
            DecodedValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

pub const HARDWARE_REVISION: RegisterInfo =
    RegisterInfo::input("hardware_revision", 1, ValueKind::Version);
pub const FIRMWARE_VERSION: RegisterInfo =
    RegisterInfo::input("firmware_version", 2, ValueKind::Version);
pub const MODBUS_MAP_VERSION: RegisterInfo =
    RegisterInfo::input("modbus_map_version", 3, ValueKind::Version);
pub const OUTDOOR_AIR_TEMPERATURE: RegisterInfo =
    RegisterInfo::input("outdoor_air_temperature", 4, ValueKind::Temperature);
pub const EXTRACT_AIR_TEMPERATURE: RegisterInfo =
    RegisterInfo::input("extract_air_temperature", 6, ValueKind::Temperature);
pub const EXHAUST_AIR_TEMPERATURE: RegisterInfo =
    RegisterInfo::input("exhaust_air_temperature", 7, ValueKind::Temperature);
pub const SUPPLY_AIR_TEMPERATURE: RegisterInfo =
    RegisterInfo::input("supply_air_temperature", 8, ValueKind::Temperature);
pub const EXTRACT_AIR_HUMIDITY: RegisterInfo =
    RegisterInfo::input("extract_air_humidity", 23, ValueKind::Percent);

pub const FAN_SPEED: RegisterInfo = RegisterInfo::holding("fan_speed", 1, ValueKind::Raw);
pub const SUPPLY_TEMPERATURE_SETPOINT: RegisterInfo =
    RegisterInfo::holding("supply_temperature_setpoint", 5, ValueKind::Temperature);
pub const ACTIVE: RegisterInfo = RegisterInfo::holding("active", 12, ValueKind::Switch);
pub const FILTER_CHANGE_INDICATION: RegisterInfo =
    RegisterInfo::holding("filter_change_indication", 34, ValueKind::Switch);
pub const MINIMUM_TEMPERATURE_SETPOINT: RegisterInfo =
    RegisterInfo::holding("minimum_temperature_setpoint", 50, ValueKind::Celsius)
        .gated(Feature::MinimumTemperatureSet);
pub const BOOSTED_COOLING: RegisterInfo =
    RegisterInfo::holding("boosted_cooling", 51, ValueKind::Switch).gated(Feature::BoostedCooling);
pub const SAUNA_FUNCTION: RegisterInfo =
    RegisterInfo::holding("sauna_function", 57, ValueKind::Switch).gated(Feature::SaunaFunction);
pub const FIREPLACE_FUNCTION: RegisterInfo =
    RegisterInfo::holding("fireplace_function", 58, ValueKind::Switch)
        .gated(Feature::FireplaceFunction);

/// Every catalogued register
pub static CATALOGUE: [RegisterInfo; 16] = [
    HARDWARE_REVISION,
    FIRMWARE_VERSION,
    MODBUS_MAP_VERSION,
    OUTDOOR_AIR_TEMPERATURE,
    EXTRACT_AIR_TEMPERATURE,
    EXHAUST_AIR_TEMPERATURE,
    SUPPLY_AIR_TEMPERATURE,
    EXTRACT_AIR_HUMIDITY,
    FAN_SPEED,
    SUPPLY_TEMPERATURE_SETPOINT,
    ACTIVE,
    FILTER_CHANGE_INDICATION,
    MINIMUM_TEMPERATURE_SETPOINT,
    BOOSTED_COOLING,
    SAUNA_FUNCTION,
    FIREPLACE_FUNCTION,
];

/// Switch register backing a feature
pub fn feature_switch(feature: Feature) -> Option<RegisterInfo> {
    CATALOGUE
        .iter()
        .find(|info| info.feature == Some(feature) && info.kind == ValueKind::Switch)
        .copied()
}

/// Catalogue entries present on a unit with `features`
pub fn available(features: &FeatureFlags) -> impl Iterator<Item = &'static RegisterInfo> + '_ {
    CATALOGUE.iter().filter(move |info| info.is_available(features))
}
