//! Airfi Modbus client
//!
//! Session-oriented client: `open` once, issue any number of reads and writes,
//! `close`. Operations never open the socket implicitly. Requests are
//! serialized through the session lock because the controller cannot handle
//! pipelined requests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::address::RegisterBank;
use crate::connection::ModbusConnection;
use crate::constants::{
    AIRFI_MAX_READ_REGISTERS, DEFAULT_MODBUS_PORT, DEFAULT_TIMEOUT, DEFAULT_UNIT_ID,
};
use crate::error::{ModbusLinkError, Result};
use crate::logger::{DeviceLogger, SessionState};
use crate::pdu::{
    build_read_request, build_write_single_request, parse_read_response,
    parse_write_single_response, ModbusPdu,
};
use crate::transport::ModbusFrameProcessor;

/// Register-level access to one controller.
///
/// The sync engine only talks to the controller through this trait.
#[async_trait]
pub trait RegisterTransport: Send + Sync {
    /// Establish the session. Succeeds without reconnecting if already open.
    async fn open(&self) -> Result<()>;

    /// Tear the session down. No-op when already closed.
    async fn close(&self);

    /// Read `length` registers of `bank` starting at 1-based `start_offset`
    async fn read_block(&self, bank: RegisterBank, start_offset: u16, length: u16)
        -> Result<Vec<u16>>;

    /// Write one holding register at 1-based `offset`
    async fn write_single(&self, offset: u16, value: u16) -> Result<()>;

    async fn state(&self) -> SessionState;
}

/// Connection parameters
#[derive(Debug, Clone)]
pub struct ClientParams {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub timeout: Duration,
}

impl ClientParams {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            unit_id: DEFAULT_UNIT_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientParams {
    fn default() -> Self {
        Self::new("127.0.0.1", DEFAULT_MODBUS_PORT)
    }
}

#[derive(Debug, Default)]
struct Session {
    state: SessionState,
    connection: Option<ModbusConnection>,
    processor: ModbusFrameProcessor,
}

impl Session {
    fn transition(&mut self, logger: &DeviceLogger, new_state: SessionState, reason: &str) {
        if self.state != new_state {
            logger.log_status(self.state, new_state, reason);
            self.state = new_state;
        }
    }

    /// Drop the socket after a transport failure
    fn abort(&mut self, logger: &DeviceLogger, reason: &str) {
        self.connection = None;
        self.processor.clear_pending();
        self.transition(logger, SessionState::Closed, reason);
    }
}

/// Modbus TCP client for one Airfi controller
#[derive(Debug)]
pub struct AirfiModbusClient {
    params: ClientParams,
    session: Mutex<Session>,
    logger: DeviceLogger,
}

impl AirfiModbusClient {
    pub fn new(params: ClientParams, logger: DeviceLogger) -> Self {
        Self {
            params,
            session: Mutex::new(Session::default()),
            logger,
        }
    }

    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    /// One request/response round trip on an open session
    async fn request(&self, session: &mut Session, pdu: &ModbusPdu) -> Result<ModbusPdu> {
        if !session.state.is_open() {
            return Err(ModbusLinkError::NotConnected);
        }
        let Some(connection) = session.connection.as_mut() else {
            return Err(ModbusLinkError::NotConnected);
        };

        let frame = session.processor.build_frame(self.params.unit_id, pdu);
        self.logger.log_raw_message("TX", &frame);

        let result = match connection.send(&frame, self.params.timeout).await {
            Ok(()) => connection.receive(self.params.timeout).await,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // A timeout on an open socket is a socket failure, not a retry
                session.abort(&self.logger, &e.to_string());
                return Err(e);
            },
        };
        self.logger.log_raw_message("RX", &response);

        session.processor.parse_frame(&response)
    }
}

#[async_trait]
impl RegisterTransport for AirfiModbusClient {
    async fn open(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.state.is_open() {
            return Ok(());
        }

        let target = format!("{}:{}", self.params.host, self.params.port);
        session.transition(&self.logger, SessionState::Opening, "open requested");
        self.logger
            .log_connect(&target, &format!("timeout={}ms", self.params.timeout.as_millis()));

        match ModbusConnection::connect_tcp(&self.params.host, self.params.port, self.params.timeout)
            .await
        {
            Ok(connection) => {
                session.connection = Some(connection);
                session.transition(&self.logger, SessionState::Open, "connected");
                Ok(())
            },
            Err(e) => {
                session.abort(&self.logger, &e.to_string());
                Err(e)
            },
        }
    }

    async fn close(&self) {
        let mut session = self.session.lock().await;
        if session.state == SessionState::Closed && session.connection.is_none() {
            return;
        }

        session.transition(&self.logger, SessionState::Closing, "close requested");
        if let Some(connection) = session.connection.take() {
            // Peer may already be gone
            let _ = connection.shutdown().await;
        }
        session.processor.clear_pending();
        session.transition(&self.logger, SessionState::Closed, "closed");
    }

    async fn read_block(
        &self,
        bank: RegisterBank,
        start_offset: u16,
        length: u16,
    ) -> Result<Vec<u16>> {
        if start_offset == 0 {
            return Err(ModbusLinkError::InvalidAddress(format!(
                "{}x{:05}",
                bank.prefix(),
                start_offset
            )));
        }

        let mut session = self.session.lock().await;
        if !session.state.is_open() {
            return Err(ModbusLinkError::NotConnected);
        }

        let function_code = bank.read_function_code();
        let mut values = Vec::with_capacity(length as usize);
        let mut remaining = length;
        let mut offset = start_offset;

        while remaining > 0 {
            let count = remaining.min(AIRFI_MAX_READ_REGISTERS);
            self.logger.log_poll(function_code, offset, count);

            let request = build_read_request(function_code, offset, count)?;
            let response = self.request(&mut session, &request).await?;
            values.extend(parse_read_response(&response, function_code, count)?);

            remaining -= count;
            offset = offset.saturating_add(count);
        }

        if values.len() != length as usize {
            return Err(ModbusLinkError::ShortRead {
                expected: length as usize,
                actual: values.len(),
            });
        }

        Ok(values)
    }

    async fn write_single(&self, offset: u16, value: u16) -> Result<()> {
        if offset == 0 {
            return Err(ModbusLinkError::InvalidAddress(format!("4x{:05}", offset)));
        }

        let mut session = self.session.lock().await;
        if !session.state.is_open() {
            return Err(ModbusLinkError::NotConnected);
        }

        let request = build_write_single_request(offset, value)?;
        let response = self.request(&mut session, &request).await?;
        parse_write_single_response(&response, offset, value)
    }

    async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }
}
