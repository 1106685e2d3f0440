//! Modbus PDU data structure
//!
//! Fixed-size stack buffer plus the request builders and response parsers for
//! the three function codes the Airfi controller needs.

use tracing::debug;

use crate::constants::{
    FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_WRITE_SINGLE_REGISTER, MAX_PDU_SIZE,
};
use crate::error::{ModbusLinkError, Result};

/// PDU with stack-allocated fixed array
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Create a PDU from a byte slice
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusLinkError::protocol(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();

        if let Some(fc) = pdu.function_code() {
            if pdu.is_exception() {
                debug!(
                    "PDU parsed: FC={:02X} (Exception: {}), exception_code={:02X}",
                    fc,
                    function_code_description(fc),
                    pdu.exception_code().unwrap_or(0)
                );
            } else {
                debug!(
                    "PDU parsed: FC={:02X} ({}), data_len={}",
                    fc,
                    function_code_description(fc),
                    pdu.len - 1
                );
            }
        }

        Ok(pdu)
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusLinkError::protocol("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        (self.len > 0).then(|| self.data[0])
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code().is_some_and(|fc| fc & 0x80 != 0)
    }

    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        (self.is_exception() && self.len > 1).then(|| self.data[1])
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable function code description
pub fn function_code_description(fc: u8) -> &'static str {
    match fc & 0x7F {
        FC_READ_HOLDING_REGISTERS => "Read Holding Registers",
        FC_READ_INPUT_REGISTERS => "Read Input Registers",
        FC_WRITE_SINGLE_REGISTER => "Write Single Register",
        _ => "Unknown Function",
    }
}

/// PDU builder - fluent API
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    #[inline]
    pub fn function_code(mut self, fc: u8) -> Result<Self> {
        self.pdu.push(fc)?;
        Ok(self)
    }

    #[inline]
    pub fn address(mut self, addr: u16) -> Result<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    #[inline]
    pub fn quantity(mut self, qty: u16) -> Result<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    #[inline]
    pub fn value(mut self, value: u16) -> Result<Self> {
        self.pdu.push_u16(value)?;
        Ok(self)
    }

    #[inline]
    pub fn build(self) -> ModbusPdu {
        self.pdu
    }
}

/// Build an FC03/FC04 read request
pub fn build_read_request(function_code: u8, address: u16, quantity: u16) -> Result<ModbusPdu> {
    Ok(PduBuilder::new()
        .function_code(function_code)?
        .address(address)?
        .quantity(quantity)?
        .build())
}

/// Build an FC06 write single register request
pub fn build_write_single_request(address: u16, value: u16) -> Result<ModbusPdu> {
    Ok(PduBuilder::new()
        .function_code(FC_WRITE_SINGLE_REGISTER)?
        .address(address)?
        .value(value)?
        .build())
}

/// Turn an exception response into a typed error
fn check_exception(pdu: &ModbusPdu) -> Result<()> {
    if pdu.is_exception() {
        return Err(ModbusLinkError::Exception {
            function: pdu.function_code().unwrap_or(0) & 0x7F,
            code: pdu.exception_code().unwrap_or(0),
        });
    }
    Ok(())
}

/// Parse an FC03/FC04 response into register values
pub fn parse_read_response(pdu: &ModbusPdu, function_code: u8, quantity: u16) -> Result<Vec<u16>> {
    check_exception(pdu)?;

    let data = pdu.as_slice();
    if data.len() < 2 {
        return Err(ModbusLinkError::protocol("Read response too short"));
    }
    if data[0] != function_code {
        return Err(ModbusLinkError::protocol(format!(
            "Function code mismatch: expected {:02X}, got {:02X}",
            function_code, data[0]
        )));
    }

    let byte_count = data[1] as usize;
    if data.len() != 2 + byte_count || byte_count % 2 != 0 {
        return Err(ModbusLinkError::protocol(format!(
            "Invalid byte count {} for {} data bytes",
            byte_count,
            data.len() - 2
        )));
    }

    let values: Vec<u16> = data[2..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    if values.len() != quantity as usize {
        return Err(ModbusLinkError::ShortRead {
            expected: quantity as usize,
            actual: values.len(),
        });
    }

    Ok(values)
}

/// Validate an FC06 response; the controller echoes address and value
pub fn parse_write_single_response(pdu: &ModbusPdu, address: u16, value: u16) -> Result<()> {
    check_exception(pdu)?;

    let data = pdu.as_slice();
    if data.len() != 5 || data[0] != FC_WRITE_SINGLE_REGISTER {
        return Err(ModbusLinkError::protocol(format!(
            "Invalid write single register response: {:02X?}",
            data
        )));
    }
    let echoed_address = u16::from_be_bytes([data[1], data[2]]);
    let echoed_value = u16::from_be_bytes([data[3], data[4]]);
    if echoed_address != address || echoed_value != value {
        return Err(ModbusLinkError::protocol(format!(
            "Write echo mismatch: sent {}={}, got {}={}",
            address, value, echoed_address, echoed_value
        )));
    }
    Ok(())
}
