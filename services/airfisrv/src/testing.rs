//! Scripted transport used by unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use airfi_modbus::{ModbusLinkError, RegisterBank, RegisterTransport, SessionState};
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Close,
    Read(RegisterBank, u16, u16),
    Write(u16, u16),
}

/// In-memory controller that records every call
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    input: Mutex<Vec<u16>>,
    holding: Mutex<Vec<u16>>,
    calls: Mutex<Vec<Call>>,
    open: AtomicBool,
    fail_open: AtomicBool,
    fail_reads: AtomicBool,
    failing_writes: Mutex<Vec<u16>>,
    read_delay: Mutex<Duration>,
}

impl ScriptedTransport {
    /// Controller with the given firmware/map registers and bank sizes
    pub fn with_device(firmware: u16, map_version: u16, input_len: usize, holding_len: usize) -> Self {
        let mut input = vec![0u16; input_len.max(3)];
        input[0] = 10;
        input[1] = firmware;
        input[2] = map_version;
        let transport = Self::default();
        *transport.input.lock() = input;
        *transport.holding.lock() = vec![0u16; holding_len];
        transport
    }

    pub fn set_input(&self, offset: u16, value: u16) {
        self.input.lock()[offset as usize - 1] = value;
    }

    pub fn set_holding(&self, offset: u16, value: u16) {
        self.holding.lock()[offset as usize - 1] = value;
    }

    pub fn holding(&self, offset: u16) -> u16 {
        self.holding.lock()[offset as usize - 1]
    }

    pub fn truncate_input(&self, len: usize) {
        self.input.lock().truncate(len);
    }

    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_write_to(&self, offset: u16) {
        self.failing_writes.lock().push(offset);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegisterTransport for ScriptedTransport {
    async fn open(&self) -> airfi_modbus::Result<()> {
        self.calls.lock().push(Call::Open);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(ModbusLinkError::connection("connection refused"));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.calls.lock().push(Call::Close);
        self.open.store(false, Ordering::SeqCst);
    }

    async fn read_block(
        &self,
        bank: RegisterBank,
        start_offset: u16,
        length: u16,
    ) -> airfi_modbus::Result<Vec<u16>> {
        self.calls.lock().push(Call::Read(bank, start_offset, length));
        if !self.is_open() {
            return Err(ModbusLinkError::NotConnected);
        }

        let delay = *self.read_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ModbusLinkError::timeout("read timed out"));
        }

        let values = match bank {
            RegisterBank::Input => self.input.lock().clone(),
            RegisterBank::Holding => self.holding.lock().clone(),
        };
        let start = start_offset as usize - 1;
        let end = (start + length as usize).min(values.len());
        let block: Vec<u16> = values.get(start..end).map(<[u16]>::to_vec).unwrap_or_default();
        if block.len() != length as usize {
            return Err(ModbusLinkError::ShortRead {
                expected: length as usize,
                actual: block.len(),
            });
        }
        Ok(block)
    }

    async fn write_single(&self, offset: u16, value: u16) -> airfi_modbus::Result<()> {
        self.calls.lock().push(Call::Write(offset, value));
        if !self.is_open() {
            return Err(ModbusLinkError::NotConnected);
        }
        if self.failing_writes.lock().contains(&offset) {
            return Err(ModbusLinkError::Exception {
                function: 6,
                code: 2,
            });
        }
        self.holding.lock()[offset as usize - 1] = value;
        Ok(())
    }

    async fn state(&self) -> SessionState {
        if self.is_open() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }
}
