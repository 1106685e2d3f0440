//! Airfi device facade
//!
//! [`AirfiDevice`] is what the rest of the service and any capability
//! adapter talks to. Adapters only need [`RegisterAccess`]: read a value,
//! queue a write, ask for a feature.

use std::sync::Arc;

use airfi_modbus::{AirfiModbusClient, DeviceLogger, RegisterAddress, RegisterTransport};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::config::{DeviceConfig, SyncConfig};
use crate::engine::{DeviceEvent, SyncEngine, SyncSettings};
use crate::error::{AirfiError, Result};
use crate::features::{Feature, FeatureFlags};
use crate::negotiator::{DeviceProfile, Negotiator};
use crate::registers::{self, DecodedValue};

/// Register-level contract used by capability adapters
pub trait RegisterAccess: Send + Sync {
    /// Last known value, `None` until the register has been read
    fn get_register_value(&self, address: &str) -> Result<Option<u16>>;

    /// Queue a holding register write; the value is visible immediately
    fn queue_write(&self, address: &str, value: u16) -> Result<()>;

    fn has_feature(&self, name: &str) -> bool;
}

/// One named register value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterReading {
    pub key: &'static str,
    pub address: String,
    pub value: DecodedValue,
}

/// One air handling unit
#[derive(Debug, Clone)]
pub struct AirfiDevice {
    engine: SyncEngine,
    config: DeviceConfig,
}

impl AirfiDevice {
    /// Device talking Modbus/TCP to the configured host
    pub fn new(
        config: DeviceConfig,
        sync: &SyncConfig,
        settings: SyncSettings,
        negotiator: Negotiator,
        events: UnboundedSender<DeviceEvent>,
    ) -> Result<Self> {
        let params = config.client_params(sync)?;
        let logger = DeviceLogger::new(config.display_name());
        let transport: Arc<dyn RegisterTransport> = Arc::new(AirfiModbusClient::new(params, logger));
        Ok(Self::with_transport(config, transport, settings, negotiator, events))
    }

    /// Device on an arbitrary transport
    pub fn with_transport(
        config: DeviceConfig,
        transport: Arc<dyn RegisterTransport>,
        settings: SyncSettings,
        negotiator: Negotiator,
        events: UnboundedSender<DeviceEvent>,
    ) -> Self {
        let engine = SyncEngine::new(config.display_name(), transport, negotiator, settings, events);
        Self { engine, config }
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn profile(&self) -> Option<DeviceProfile> {
        self.engine.profile()
    }

    /// Features of the negotiated unit, empty before initialization
    pub fn features(&self) -> FeatureFlags {
        self.engine
            .profile()
            .map(|profile| profile.features)
            .unwrap_or_default()
    }

    /// Negotiate and start syncing.
    ///
    /// A failure is logged, reported as [`DeviceEvent::Error`] and returned;
    /// the device then stays stopped.
    pub async fn initialize(&self) -> Result<DeviceProfile> {
        match self.engine.initialize().await {
            Ok(profile) => {
                let switches = self.config.exposed_switches(&profile.features);
                debug!("Exposed switches of {}: {:?}", self.name(), switches);
                Ok(profile)
            },
            Err(e) => {
                error!("Error while initializing \"{}\": {}", self.name(), e);
                self.engine.emit(DeviceEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            },
        }
    }

    pub async fn restart_sync(&self, delay: std::time::Duration) {
        self.engine.restart_sync(delay).await;
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    /// Switches to expose for this unit
    pub fn exposed_switches(&self) -> Vec<Feature> {
        self.config.exposed_switches(&self.features())
    }

    /// Decoded values of every catalogued register the unit has
    pub fn readings(&self) -> Vec<RegisterReading> {
        let features = self.features();
        registers::available(&features)
            .filter_map(|info| {
                let raw = self.engine.store().get_value(&info.address)?;
                Some(RegisterReading {
                    key: info.key,
                    address: info.address.to_string(),
                    value: info.decode(raw),
                })
            })
            .collect()
    }

    /// Queue a supply temperature setpoint. Units with a minimum temperature
    /// register get the whole-degree value there as well.
    pub fn set_supply_temperature(&self, celsius: f64) -> Result<()> {
        for info in [
            registers::SUPPLY_TEMPERATURE_SETPOINT,
            registers::MINIMUM_TEMPERATURE_SETPOINT,
        ] {
            if !info.is_available(&self.features()) {
                continue;
            }
            if let Some(raw) = info.encode(celsius) {
                self.queue_write(&info.address.to_string(), raw)?;
            }
        }
        Ok(())
    }

    fn parse_address(&self, text: &str) -> Result<RegisterAddress> {
        RegisterAddress::parse(text).map_err(|_| {
            let err = AirfiError::InvalidAddressFormat(text.to_string());
            error!("{}", err);
            err
        })
    }
}

impl RegisterAccess for AirfiDevice {
    fn get_register_value(&self, address: &str) -> Result<Option<u16>> {
        let address = self.parse_address(address)?;
        Ok(self.engine.store().get_value(&address))
    }

    fn queue_write(&self, address: &str, value: u16) -> Result<()> {
        let address = self.parse_address(address)?;
        if !address.bank().is_writable() {
            let err = AirfiError::NotWritable(address.bank().prefix().to_string());
            error!("{}", err);
            return Err(err);
        }

        self.engine.store().apply_optimistic_write(&address, value);
        self.engine.queue().insert(address.offset(), value);
        debug!("Queued {} = {} for {}", address, value, self.name());
        Ok(())
    }

    fn has_feature(&self, name: &str) -> bool {
        self.features().has_named(name)
    }
}
