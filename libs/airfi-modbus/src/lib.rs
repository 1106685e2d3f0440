//! Airfi Modbus Link Library
//!
//! Link-layer components for talking to an Airfi air handling unit over Modbus TCP.
//!
//! # Architecture
//!
//! ```text
//! airfi-modbus
//!     ├── address     (textual "3x00001" / "4x00005" register addresses)
//!     ├── pdu         (FC03 / FC04 / FC06 request building, response parsing)
//!     ├── transport   (MBAP header handling and request tracking)
//!     ├── connection  (TCP socket with bounded timeouts)
//!     ├── client      (open / close / chunked read / single write)
//!     ├── codec       (temperature and version register decoding)
//!     ├── logger      (per-device tagged logging)
//!     └── simulator   (in-process controller for tests and demos)
//! ```
//!
//! The controller accepts at most [`AIRFI_MAX_READ_REGISTERS`] registers per
//! read request and does not pipeline requests, so [`AirfiModbusClient`] splits
//! long reads into sequential sub-reads.

pub mod address;
pub mod client;
pub mod codec;
pub mod connection;
pub mod constants;
pub mod error;
pub mod logger;
pub mod pdu;
pub mod simulator;
pub mod transport;

pub use address::{RegisterAddress, RegisterBank};
pub use client::{AirfiModbusClient, ClientParams, RegisterTransport};
pub use codec::{decode_temperature, decode_version, encode_temperature};
pub use constants::{
    AIRFI_MAX_READ_REGISTERS, DEFAULT_MODBUS_PORT, DEFAULT_TIMEOUT, DEFAULT_UNIT_ID,
};
pub use error::{ModbusLinkError, Result};
pub use logger::{DeviceLogger, SessionState};
pub use simulator::{ModbusSimulator, SimulatorRequest};
