//! Airfi air handling unit sync service
//!
//! Keeps an in-memory copy of an Airfi controller's register banks in sync
//! over Modbus/TCP and queues writes from capability adapters.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  get / queue   ┌──────────────┐   ticks    ┌──────────────┐
//! │   adapters   │───────────────►│ AirfiDevice  │───────────►│  SyncEngine  │
//! │(RegisterAccess)               │   (facade)   │            │ (scheduler)  │
//! └──────────────┘                └──────┬───────┘            └──────┬───────┘
//!                                        │                           │
//!                              ┌─────────┴────────┐        ┌─────────┴────────┐
//!                              │ RegisterStore    │◄───────│ Negotiator       │
//!                              │ WriteQueue       │        │ RegisterTransport│
//!                              └──────────────────┘        └──────────────────┘
//! ```
//!
//! - **`negotiator`**: probes firmware and map version, picks bank sizes and features
//! - **`engine`**: periodic sync with write draining, read throttling and restarts
//! - **`queue`** / **`store`**: pending writes and last-known register values
//! - **`device`**: the facade adapters use
//! - **`service`**: one supervised device per configuration entry

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod features;
pub mod logging;
pub mod negotiator;
pub mod queue;
pub mod registers;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{AirfiConfig, DeviceConfig};
pub use device::{AirfiDevice, RegisterAccess, RegisterReading};
pub use engine::{DeviceEvent, SyncEngine, SyncSettings};
pub use error::{AirfiError, Remediation, Result};
pub use features::{Feature, FeatureFlags};
pub use negotiator::{CapabilityTable, DeviceProfile, Negotiator, ProbeResult, RegisterLengths};
