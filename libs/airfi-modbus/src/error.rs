//! Link Error Types
//!
//! Error types for the Modbus link layer.

use thiserror::Error;

/// Result type for airfi-modbus operations
pub type Result<T> = std::result::Result<T, ModbusLinkError>;

/// Modbus link errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModbusLinkError {
    /// Socket could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connect, send or receive exceeded the I/O timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors on an open socket
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed or unexpected frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Controller answered with a Modbus exception
    #[error("Modbus exception: function {function:#04X}, code {code:#04X} ({})", exception_description(*.code))]
    Exception { function: u8, code: u8 },

    /// Operation attempted without an open session
    #[error("Not connected")]
    NotConnected,

    /// Chunked read returned a different number of registers than requested
    #[error("Result length ({actual}) does not match with query length ({expected})")]
    ShortRead { expected: usize, actual: usize },

    /// Register address text did not match `{3|4}x{5 digits}`
    #[error("Invalid register address format for \"{0}\"")]
    InvalidAddress(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ModbusLinkError {
    fn from(err: std::io::Error) -> Self {
        ModbusLinkError::Io(err.to_string())
    }
}

// Helper methods for creating errors
impl ModbusLinkError {
    pub fn connection(msg: impl Into<String>) -> Self {
        ModbusLinkError::Connection(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        ModbusLinkError::Timeout(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        ModbusLinkError::Io(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        ModbusLinkError::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ModbusLinkError::Config(msg.into())
    }

    /// Check if this error means the socket is no longer usable
    pub fn needs_reconnect(&self) -> bool {
        match self {
            ModbusLinkError::Io(msg) => {
                msg.contains("Broken pipe")
                    || msg.contains("Connection reset")
                    || msg.contains("Connection refused")
                    || msg.contains("Connection aborted")
                    || msg.contains("Network is unreachable")
            },
            ModbusLinkError::Connection(_)
            | ModbusLinkError::Timeout(_)
            | ModbusLinkError::NotConnected => true,
            _ => false,
        }
    }
}

/// Human-readable Modbus exception code
fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Server Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Server Device Busy",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Failed To Respond",
        _ => "Unknown Exception",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_message_matches_controller_wording() {
        let err = ModbusLinkError::ShortRead {
            expected: 58,
            actual: 30,
        };
        assert_eq!(
            err.to_string(),
            "Result length (30) does not match with query length (58)"
        );
    }

    #[test]
    fn test_exception_message_includes_description() {
        let err = ModbusLinkError::Exception {
            function: 0x03,
            code: 0x02,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x03"));
        assert!(msg.contains("Illegal Data Address"));
    }

    #[test]
    fn test_needs_reconnect() {
        assert!(ModbusLinkError::io("Connection reset by peer").needs_reconnect());
        assert!(ModbusLinkError::timeout("read").needs_reconnect());
        assert!(ModbusLinkError::NotConnected.needs_reconnect());
        assert!(!ModbusLinkError::protocol("bad frame").needs_reconnect());
        assert!(!ModbusLinkError::Exception {
            function: 0x06,
            code: 0x03
        }
        .needs_reconnect());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Broken pipe");
        let err: ModbusLinkError = io.into();
        assert!(matches!(err, ModbusLinkError::Io(_)));
        assert!(err.needs_reconnect());
    }
}
