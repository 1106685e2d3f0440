//! Per-device logging
//!
//! Every line carries the device name as a `device` field so output from
//! several units can be told apart.

use std::fmt;

use tracing::{debug, info, trace, warn};

/// State of one client session towards the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "CLOSED"),
            SessionState::Opening => write!(f, "OPENING"),
            SessionState::Open => write!(f, "OPEN"),
            SessionState::Closing => write!(f, "CLOSING"),
        }
    }
}

/// Logger bound to one device
#[derive(Debug, Clone)]
pub struct DeviceLogger {
    device: String,
}

impl DeviceLogger {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn log_connect(&self, target: &str, details: &str) {
        debug!(device = %self.device, "[CONNECT] {} - {}", target, details);
    }

    pub fn log_status(&self, old_state: SessionState, new_state: SessionState, reason: &str) {
        debug!(device = %self.device, "[STATUS] {} -> {} - {}", old_state, new_state, reason);
    }

    pub fn log_info(&self, message: &str) {
        info!(device = %self.device, "{}", message);
    }

    pub fn log_warn(&self, message: &str) {
        warn!(device = %self.device, "{}", message);
    }

    /// Log one chunk of a block read
    pub fn log_poll(&self, function_code: u8, start: u16, count: u16) {
        debug!(
            device = %self.device,
            "[poll] f{:02} start={} x{}",
            function_code, start, count
        );
    }

    /// Log raw Modbus frame
    pub fn log_raw_message(&self, direction: &str, raw_frame: &[u8]) {
        let hex_str = raw_frame
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");

        if raw_frame.len() >= 8 {
            let tid = u16::from_be_bytes([raw_frame[0], raw_frame[1]]);
            trace!(
                device = %self.device,
                "[{}] TID={:04X} Unit={} FC={:02X} Frame:[{}]",
                direction, tid, raw_frame[6], raw_frame[7], hex_str
            );
        } else {
            trace!(device = %self.device, "[{}] Frame:[{}]", direction, hex_str);
        }
    }
}
