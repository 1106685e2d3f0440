//! Modbus protocol and Airfi controller constants

use std::time::Duration;

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
/// Note: Unit ID is counted by the Length field, not by MBAP_HEADER_LEN
pub const MBAP_HEADER_LEN: usize = 6;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Response buffer size for receiving Modbus frames
pub const MODBUS_RESPONSE_BUFFER_SIZE: usize = 512;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Holding Registers
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Register
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

// ============================================================================
// Airfi Controller Limits
// ============================================================================

/// Maximum number of registers the Airfi controller returns per read request.
///
/// Far below the protocol limit of 125; longer reads are split into
/// sequential sub-reads of at most this many registers.
pub const AIRFI_MAX_READ_REGISTERS: u16 = 30;

/// Unit identifier the controller answers to
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Standard Modbus TCP port
pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// Connect / request timeout applied to every socket operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Calculate total Modbus TCP frame size (MBAP header + unit id + PDU)
#[inline]
pub const fn mbap_frame_size(pdu_len: usize) -> usize {
    MBAP_HEADER_LEN + 1 + pdu_len
}
