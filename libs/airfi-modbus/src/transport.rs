//! Modbus TCP framing
//!
//! Wraps PDUs in an MBAP header and validates responses against the request
//! that is in flight. The controller handles one request at a time, so at most
//! one request is tracked.

use tracing::debug;

use crate::constants::{MAX_MBAP_LENGTH, MBAP_HEADER_LEN};
use crate::error::{ModbusLinkError, Result};
use crate::pdu::ModbusPdu;

/// Modbus TCP MBAP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    /// Protocol identifier (fixed to 0)
    pub protocol_id: u16,
    /// Length of unit id + PDU
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Decode the 7 header bytes (MBAP + unit id)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MBAP_HEADER_LEN + 1 {
            return Err(ModbusLinkError::protocol("MBAP header too short"));
        }
        let header = Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        };

        if header.protocol_id != 0 {
            return Err(ModbusLinkError::protocol(format!(
                "Invalid protocol ID: expected 0, got {}",
                header.protocol_id
            )));
        }
        if header.length == 0 || header.length as usize > MAX_MBAP_LENGTH {
            return Err(ModbusLinkError::protocol(format!(
                "Invalid MBAP length: {}",
                header.length
            )));
        }
        Ok(header)
    }

    /// Number of PDU bytes that follow the unit id
    pub fn pdu_len(&self) -> usize {
        self.length as usize - 1
    }
}

/// Encode a complete TCP frame (MBAP + unit id + PDU)
pub fn encode_tcp_frame(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let length = (pdu.len() + 1) as u16;
    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + 1 + pdu.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.push(unit_id);
    frame.extend_from_slice(pdu);
    frame
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    transaction_id: u16,
    function_code: u8,
    unit_id: u8,
}

/// Modbus TCP frame processor
#[derive(Debug)]
pub struct ModbusFrameProcessor {
    pending: Option<PendingRequest>,
    next_transaction_id: u16,
}

impl Default for ModbusFrameProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ModbusFrameProcessor {
    pub fn new() -> Self {
        Self {
            pending: None,
            next_transaction_id: 1,
        }
    }

    /// Get next transaction ID, wrapping from 0xFFFF to 0x0000
    pub fn next_transaction_id(&mut self) -> u16 {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        id
    }

    /// Build a request frame and remember it as the request in flight
    pub fn build_frame(&mut self, unit_id: u8, pdu: &ModbusPdu) -> Vec<u8> {
        let transaction_id = self.next_transaction_id();
        let function_code = pdu.function_code().unwrap_or(0);

        self.pending = Some(PendingRequest {
            transaction_id,
            function_code,
            unit_id,
        });

        debug!(
            "Building TCP frame: trans_id={:04X}, unit_id={}, FC={:02X}, PDU_len={}",
            transaction_id,
            unit_id,
            function_code,
            pdu.len()
        );

        encode_tcp_frame(transaction_id, unit_id, pdu.as_slice())
    }

    /// Drop the request in flight (after a timeout or I/O failure)
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Parse a response frame, checking it answers the request in flight
    pub fn parse_frame(&mut self, data: &[u8]) -> Result<ModbusPdu> {
        let header = MbapHeader::decode(data)?;

        if data.len() != MBAP_HEADER_LEN + header.length as usize {
            return Err(ModbusLinkError::protocol(format!(
                "Invalid TCP frame length: expected {}, got {}",
                MBAP_HEADER_LEN + header.length as usize,
                data.len()
            )));
        }

        let pdu = ModbusPdu::from_slice(&data[MBAP_HEADER_LEN + 1..])?;

        let pending = self
            .pending
            .ok_or_else(|| ModbusLinkError::protocol("Unexpected response - no request in flight"))?;

        if pending.transaction_id != header.transaction_id {
            return Err(ModbusLinkError::protocol(format!(
                "Transaction ID mismatch: expected {:04X}, got {:04X}",
                pending.transaction_id, header.transaction_id
            )));
        }

        let response_fc = pdu.function_code().map(|fc| fc & 0x7F).unwrap_or(0);
        if response_fc != pending.function_code || header.unit_id != pending.unit_id {
            return Err(ModbusLinkError::protocol(format!(
                "Response mismatch: expected FC={:02X}/unit={}, got FC={:02X}/unit={}",
                pending.function_code, pending.unit_id, response_fc, header.unit_id
            )));
        }

        self.pending = None;
        Ok(pdu)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::pdu::build_read_request;

    #[test]
    fn test_build_frame_layout() {
        let mut processor = ModbusFrameProcessor::new();
        let pdu = build_read_request(0x04, 0, 3).unwrap();
        let frame = processor.build_frame(1, &pdu);

        assert_eq!(
            frame,
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x03]
        );
    }

    #[test]
    fn test_transaction_id_wraps() {
        let mut processor = ModbusFrameProcessor::new();
        processor.next_transaction_id = 0xFFFF;
        assert_eq!(processor.next_transaction_id(), 0xFFFF);
        assert_eq!(processor.next_transaction_id(), 0x0000);
    }

    #[test]
    fn test_parse_matching_response() {
        let mut processor = ModbusFrameProcessor::new();
        let pdu = build_read_request(0x03, 0, 1).unwrap();
        processor.build_frame(1, &pdu);

        let response = encode_tcp_frame(1, 1, &[0x03, 0x02, 0x00, 0x2A]);
        let parsed = processor.parse_frame(&response).unwrap();
        assert_eq!(parsed.as_slice(), &[0x03, 0x02, 0x00, 0x2A]);
    }

    #[test]
    fn test_parse_exception_response_matches_request() {
        let mut processor = ModbusFrameProcessor::new();
        let pdu = build_read_request(0x03, 0, 1).unwrap();
        processor.build_frame(1, &pdu);

        let response = encode_tcp_frame(1, 1, &[0x83, 0x02]);
        let parsed = processor.parse_frame(&response).unwrap();
        assert!(parsed.is_exception());
    }

    #[test]
    fn test_parse_rejects_wrong_transaction() {
        let mut processor = ModbusFrameProcessor::new();
        let pdu = build_read_request(0x03, 0, 1).unwrap();
        processor.build_frame(1, &pdu);

        let response = encode_tcp_frame(7, 1, &[0x03, 0x02, 0x00, 0x2A]);
        assert!(processor.parse_frame(&response).is_err());
    }

    #[test]
    fn test_parse_rejects_without_pending_request() {
        let mut processor = ModbusFrameProcessor::new();
        let response = encode_tcp_frame(1, 1, &[0x03, 0x02, 0x00, 0x2A]);
        assert!(processor.parse_frame(&response).is_err());
    }

    #[test]
    fn test_header_rejects_bad_protocol_id() {
        let mut frame = encode_tcp_frame(1, 1, &[0x03, 0x02, 0x00, 0x2A]);
        frame[3] = 0x01;
        assert!(MbapHeader::decode(&frame).is_err());
    }

    #[test]
    fn test_header_pdu_len() {
        let frame = encode_tcp_frame(9, 1, &[0x06, 0x00, 0x04, 0x00, 0xB4]);
        let header = MbapHeader::decode(&frame).unwrap();
        assert_eq!(header.transaction_id, 9);
        assert_eq!(header.pdu_len(), 5);
    }
}
