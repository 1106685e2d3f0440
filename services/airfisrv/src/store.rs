//! Last-known register values
//!
//! Two mutation paths, kept apart: full bank reads from the controller and
//! optimistic echoes of queued writes. A bank that was never read reports
//! every register as unknown (`None`); 0 is a real device value.

use std::collections::BTreeSet;

use airfi_modbus::{RegisterAddress, RegisterBank};
use parking_lot::RwLock;
use tracing::debug;

/// Where a stored value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Read from the controller
    Read,
    /// Echo of a queued write not yet confirmed by a read
    PendingWrite,
}

#[derive(Debug, Default, Clone)]
struct Bank {
    values: Option<Vec<u16>>,
    /// Offsets whose value is an optimistic echo
    echoed: BTreeSet<u16>,
}

impl Bank {
    fn replace(&mut self, values: Vec<u16>) {
        self.values = Some(values);
        self.echoed.clear();
    }

    fn get(&self, address: &RegisterAddress) -> Option<u16> {
        self.values.as_ref()?.get(address.index()).copied()
    }
}

#[derive(Debug, Default)]
struct Banks {
    input: Bank,
    holding: Bank,
}

impl Banks {
    fn bank(&self, bank: RegisterBank) -> &Bank {
        match bank {
            RegisterBank::Input => &self.input,
            RegisterBank::Holding => &self.holding,
        }
    }

    fn bank_mut(&mut self, bank: RegisterBank) -> &mut Bank {
        match bank {
            RegisterBank::Input => &mut self.input,
            RegisterBank::Holding => &mut self.holding,
        }
    }
}

/// In-memory register banks of one device
#[derive(Debug, Default)]
pub struct RegisterStore {
    banks: RwLock<Banks>,
}

impl RegisterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value at `address`, `None` when unknown
    pub fn get_value(&self, address: &RegisterAddress) -> Option<u16> {
        self.banks.read().bank(address.bank()).get(address)
    }

    pub fn value_source(&self, address: &RegisterAddress) -> Option<ValueSource> {
        let banks = self.banks.read();
        let bank = banks.bank(address.bank());
        bank.get(address)?;
        if bank.echoed.contains(&address.offset()) {
            Some(ValueSource::PendingWrite)
        } else {
            Some(ValueSource::Read)
        }
    }

    pub fn is_populated(&self, bank: RegisterBank) -> bool {
        self.banks.read().bank(bank).values.is_some()
    }

    /// Copy of a whole bank
    pub fn snapshot(&self, bank: RegisterBank) -> Option<Vec<u16>> {
        self.banks.read().bank(bank).values.clone()
    }

    /// Replace one bank with a fresh read
    pub fn apply_full_read(&self, bank: RegisterBank, values: Vec<u16>) {
        debug!("Full read of {} bank: {} registers", bank, values.len());
        self.banks.write().bank_mut(bank).replace(values);
    }

    /// Replace both banks in one step so readers never see a mix of cycles
    pub fn apply_sync_read(&self, holding: Vec<u16>, input: Vec<u16>) {
        debug!(
            "Full read: holding {} registers, input {} registers",
            holding.len(),
            input.len()
        );
        let mut banks = self.banks.write();
        banks.holding.replace(holding);
        banks.input.replace(input);
    }

    /// Echo a queued write locally until the next read overwrites it.
    ///
    /// Returns false when there is nothing to echo into: the bank was never
    /// read or the offset lies beyond the negotiated length.
    pub fn apply_optimistic_write(&self, address: &RegisterAddress, value: u16) -> bool {
        let mut banks = self.banks.write();
        let bank = banks.bank_mut(address.bank());
        let Some(slot) = bank
            .values
            .as_mut()
            .and_then(|values| values.get_mut(address.index()))
        else {
            debug!("No stored value to echo for {}", address);
            return false;
        };
        *slot = value;
        bank.echoed.insert(address.offset());
        debug!("Optimistic write {} = {}", address, value);
        true
    }

    /// Forget everything (new negotiation)
    pub fn reset(&self) {
        *self.banks.write() = Banks::default();
    }
}
