//! Error types for airfisrv

use airfi_modbus::ModbusLinkError;
use thiserror::Error;

/// Result type alias for airfisrv operations
pub type Result<T> = std::result::Result<T, AirfiError>;

/// Sync engine errors
#[derive(Debug, Error)]
pub enum AirfiError {
    /// Transport could not be opened
    #[error("Unable to connect to {target} - \"{source}\"")]
    Connection {
        target: String,
        #[source]
        source: ModbusLinkError,
    },

    /// A bank read failed
    #[error("Unable to read register - \"{0}\"")]
    Read(#[source] ModbusLinkError),

    /// A single register write failed
    #[error("Unable to write value \"{value}\" to register \"{offset}\" - \"{source}\"")]
    Write {
        offset: u16,
        value: u16,
        #[source]
        source: ModbusLinkError,
    },

    /// Register address text was not `{3|4}x{5 digits}`
    #[error("Invalid register address format for \"{0}\"")]
    InvalidAddressFormat(String),

    /// Write requested for an input register
    #[error("Wrong write register type \"{0}\". Only holding register is writable")]
    NotWritable(String),

    /// Probe returned fewer than three registers
    #[error(
        "Failed to retrieve data from the air handling unit. Please check your network \
         settings, the air handling unit is powered on and connected to a network. Then \
         restart the service and try again."
    )]
    NoDeviceData,

    /// Map version below the minimum supported version
    #[error("Device firmware version {firmware} is unsupported. Please upgrade to a newer version.")]
    UnsupportedVersion { firmware: String, map_version: String },

    /// Firmware on the denylist
    #[error(
        "Air handling unit firmware version {0} is unsupported. Please downgrade or upgrade to \
         another version."
    )]
    DenylistedFirmware(String),

    /// Operation needs a negotiated device
    #[error("Device has not been initialized")]
    NotInitialized,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Link errors outside a read/write context
    #[error(transparent)]
    Link(#[from] ModbusLinkError),
}

/// Which corrective action a user should take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    CheckNetwork,
    UpgradeFirmware,
    ChangeFirmware,
    FixConfiguration,
    None,
}

impl AirfiError {
    pub fn config(msg: impl Into<String>) -> Self {
        AirfiError::Config(msg.into())
    }

    /// The action that resolves this error
    pub fn remediation(&self) -> Remediation {
        match self {
            AirfiError::Connection { .. } | AirfiError::NoDeviceData => Remediation::CheckNetwork,
            AirfiError::UnsupportedVersion { .. } => Remediation::UpgradeFirmware,
            AirfiError::DenylistedFirmware(_) => Remediation::ChangeFirmware,
            AirfiError::Config(_)
            | AirfiError::InvalidAddressFormat(_)
            | AirfiError::NotWritable(_) => Remediation::FixConfiguration,
            AirfiError::Read(e) | AirfiError::Write { source: e, .. } | AirfiError::Link(e) => {
                if e.needs_reconnect() {
                    Remediation::CheckNetwork
                } else {
                    Remediation::None
                }
            },
            AirfiError::NotInitialized => Remediation::None,
        }
    }

    /// Negotiation failures stop the device for good
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AirfiError::NoDeviceData
                | AirfiError::UnsupportedVersion { .. }
                | AirfiError::DenylistedFirmware(_)
        )
    }
}

impl From<figment::Error> for AirfiError {
    fn from(err: figment::Error) -> Self {
        AirfiError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_messages_are_distinct() {
        let no_data = AirfiError::NoDeviceData.to_string();
        let unsupported = AirfiError::UnsupportedVersion {
            firmware: "1.4.0".to_string(),
            map_version: "1.4.0".to_string(),
        }
        .to_string();
        let denylisted = AirfiError::DenylistedFirmware("3.2.0".to_string()).to_string();

        assert!(no_data.starts_with("Failed to retrieve data from the air handling unit."));
        assert_eq!(
            unsupported,
            "Device firmware version 1.4.0 is unsupported. Please upgrade to a newer version."
        );
        assert_eq!(
            denylisted,
            "Air handling unit firmware version 3.2.0 is unsupported. Please downgrade or upgrade to another version."
        );
    }

    #[test]
    fn test_remediation() {
        assert_eq!(
            AirfiError::NoDeviceData.remediation(),
            Remediation::CheckNetwork
        );
        assert_eq!(
            AirfiError::DenylistedFirmware("3.2.0".into()).remediation(),
            Remediation::ChangeFirmware
        );
        assert_eq!(
            AirfiError::Read(ModbusLinkError::NotConnected).remediation(),
            Remediation::CheckNetwork
        );
        assert_eq!(
            AirfiError::Write {
                offset: 5,
                value: 1,
                source: ModbusLinkError::Exception {
                    function: 6,
                    code: 2
                }
            }
            .remediation(),
            Remediation::None
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(AirfiError::NoDeviceData.is_fatal());
        assert!(!AirfiError::Read(ModbusLinkError::NotConnected).is_fatal());
    }

    #[test]
    fn test_write_message() {
        let err = AirfiError::Write {
            offset: 5,
            value: 180,
            source: ModbusLinkError::NotConnected,
        };
        assert_eq!(
            err.to_string(),
            "Unable to write value \"180\" to register \"5\" - \"Not connected\""
        );
    }
}
