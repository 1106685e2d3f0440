//! Register addressing
//!
//! Airfi documents its register map in the classic `{bank}x{offset}` notation:
//! `3x00004` is input register 4, `4x00005` is holding register 5. Offsets are
//! 1-based and go on the wire unchanged: the controller expects register 1
//! at protocol address 1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS};
use crate::error::{ModbusLinkError, Result};

/// Register bank of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterBank {
    /// Read-only sensor and status data (`3x`)
    Input,
    /// Read/write configuration and setpoints (`4x`)
    Holding,
}

impl RegisterBank {
    /// Bank prefix digit used in the textual address form
    pub fn prefix(self) -> u8 {
        match self {
            RegisterBank::Input => 3,
            RegisterBank::Holding => 4,
        }
    }

    /// Function code used to read this bank
    pub fn read_function_code(self) -> u8 {
        match self {
            RegisterBank::Input => FC_READ_INPUT_REGISTERS,
            RegisterBank::Holding => FC_READ_HOLDING_REGISTERS,
        }
    }

    pub fn is_writable(self) -> bool {
        matches!(self, RegisterBank::Holding)
    }

    fn from_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            b'3' => Some(RegisterBank::Input),
            b'4' => Some(RegisterBank::Holding),
            _ => None,
        }
    }
}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterBank::Input => write!(f, "input"),
            RegisterBank::Holding => write!(f, "holding"),
        }
    }
}

/// Validated `(bank, offset)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddress {
    bank: RegisterBank,
    offset: u16,
}

impl RegisterAddress {
    /// Build an address from parts. Offset must be at least 1.
    pub fn new(bank: RegisterBank, offset: u16) -> Result<Self> {
        if offset == 0 {
            return Err(ModbusLinkError::InvalidAddress(format!(
                "{}x{:05}",
                bank.prefix(),
                offset
            )));
        }
        Ok(Self { bank, offset })
    }

    pub const fn input(offset: u16) -> Self {
        Self {
            bank: RegisterBank::Input,
            offset,
        }
    }

    pub const fn holding(offset: u16) -> Self {
        Self {
            bank: RegisterBank::Holding,
            offset,
        }
    }

    /// Parse the textual form `^[34]x\d{5}$`
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ModbusLinkError::InvalidAddress(text.to_string());

        let bytes = text.as_bytes();
        if bytes.len() != 7 || bytes[1] != b'x' {
            return Err(invalid());
        }
        let bank = RegisterBank::from_prefix(bytes[0]).ok_or_else(invalid)?;

        let digits = &text[2..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let offset: u32 = digits.parse().map_err(|_| invalid())?;
        if offset == 0 || offset > u32::from(u16::MAX) {
            return Err(invalid());
        }

        Ok(Self {
            bank,
            offset: offset as u16,
        })
    }

    pub fn bank(&self) -> RegisterBank {
        self.bank
    }

    /// 1-based offset within the bank
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// 0-based index into a bank array
    pub fn index(&self) -> usize {
        usize::from(self.offset) - 1
    }
}

impl FromStr for RegisterAddress {
    type Err = ModbusLinkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{:05}", self.bank.prefix(), self.offset)
    }
}

impl Serialize for RegisterAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegisterAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_and_holding() {
        let addr = RegisterAddress::parse("3x00004").unwrap();
        assert_eq!(addr.bank(), RegisterBank::Input);
        assert_eq!(addr.offset(), 4);
        assert_eq!(addr.index(), 3);

        let addr: RegisterAddress = "4x00058".parse().unwrap();
        assert_eq!(addr.bank(), RegisterBank::Holding);
        assert_eq!(addr.offset(), 58);
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        for text in [
            "", "3x0001", "3x000001", "5x00001", "2x00001", "3y00001", "3x0000a", "4x00000",
            " 3x00001", "3x00001 ", "3X00001", "4x99999",
        ] {
            let err = RegisterAddress::parse(text).unwrap_err();
            assert!(
                matches!(err, ModbusLinkError::InvalidAddress(ref t) if t == text),
                "expected rejection for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_display_pads_offset() {
        assert_eq!(RegisterAddress::input(3).to_string(), "3x00003");
        assert_eq!(RegisterAddress::holding(51).to_string(), "4x00051");
    }

    #[test]
    fn test_new_rejects_zero_offset() {
        assert!(RegisterAddress::new(RegisterBank::Holding, 0).is_err());
        assert_eq!(
            RegisterAddress::new(RegisterBank::Holding, 1).unwrap(),
            RegisterAddress::holding(1)
        );
    }

    #[test]
    fn test_bank_properties() {
        assert!(RegisterBank::Holding.is_writable());
        assert!(!RegisterBank::Input.is_writable());
        assert_eq!(RegisterBank::Input.read_function_code(), 0x04);
        assert_eq!(RegisterBank::Holding.read_function_code(), 0x03);
    }
}
