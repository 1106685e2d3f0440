//! Airfi controller simulator
//!
//! In-memory Modbus TCP server that behaves like the Airfi controller: FC03,
//! FC04 and FC06 only, at most 30 registers per read, one request at a time
//! per connection. Used by integration tests and for local runs without
//! hardware.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::address::RegisterBank;
use crate::constants::{
    AIRFI_MAX_READ_REGISTERS, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_SINGLE_REGISTER, MBAP_HEADER_LEN,
};
use crate::transport::{encode_tcp_frame, MbapHeader};

/// Illegal function
const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;
/// Illegal data value (quantity above the controller limit)
const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// A request as seen by the simulator, with 1-based offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorRequest {
    Read {
        bank: RegisterBank,
        start_offset: u16,
        count: u16,
    },
    Write {
        offset: u16,
        value: u16,
    },
    Unsupported {
        function_code: u8,
    },
}

#[derive(Debug, Default)]
struct SimulatorState {
    input_registers: RwLock<HashMap<u16, u16>>,
    holding_registers: RwLock<HashMap<u16, u16>>,
    requests: Mutex<Vec<SimulatorRequest>>,
    /// Function code -> exception code to answer with
    failing_functions: RwLock<HashMap<u8, u8>>,
    truncate_reads: AtomicBool,
    response_delay: RwLock<Option<Duration>>,
    connections: AtomicUsize,
}

/// Simulated Airfi controller
#[derive(Debug, Clone, Default)]
pub struct ModbusSimulator {
    state: Arc<SimulatorState>,
    accept_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ModbusSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the probe region: hardware, firmware and map version registers
    /// (e.g. `270` for map version 2.7.0)
    pub async fn init_device(&self, hardware: u16, firmware: u16, map_version: u16) {
        let mut input = self.state.input_registers.write().await;
        input.insert(1, hardware);
        input.insert(2, firmware);
        input.insert(3, map_version);
    }

    pub async fn set_input_register(&self, offset: u16, value: u16) {
        self.state.input_registers.write().await.insert(offset, value);
    }

    pub async fn set_holding_register(&self, offset: u16, value: u16) {
        self.state
            .holding_registers
            .write()
            .await
            .insert(offset, value);
    }

    /// Get holding register value (for testing)
    pub async fn get_holding_register(&self, offset: u16) -> Option<u16> {
        self.state.holding_registers.read().await.get(&offset).copied()
    }

    /// Answer every request with this function code with an exception
    pub async fn fail_function(&self, function_code: u8, exception_code: u8) {
        self.state
            .failing_functions
            .write()
            .await
            .insert(function_code, exception_code);
    }

    pub async fn clear_failures(&self) {
        self.state.failing_functions.write().await.clear();
    }

    /// Return one register fewer than requested on reads
    pub fn set_truncate_reads(&self, enabled: bool) {
        self.state.truncate_reads.store(enabled, Ordering::SeqCst);
    }

    /// Delay every response
    pub async fn set_response_delay(&self, delay: Option<Duration>) {
        *self.state.response_delay.write().await = delay;
    }

    /// Requests received so far, in arrival order
    pub async fn requests(&self) -> Vec<SimulatorRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn clear_requests(&self) {
        self.state.requests.lock().await.clear();
    }

    /// Number of accepted TCP connections
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Start simulator server. Port 0 picks a free port.
    pub async fn start(&self, port: u16) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let local_addr = listener.local_addr()?;
        info!("Airfi simulator listening on {}", local_addr);

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("New connection from {}", addr);
                        state.connections.fetch_add(1, Ordering::SeqCst);
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&state, stream).await {
                                debug!("Connection closed: {}", e);
                            }
                        });
                    },
                    Err(e) => {
                        error!("Accept error: {}", e);
                        break;
                    },
                }
            }
        });

        if let Some(previous) = self.accept_task.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(local_addr)
    }

    /// Stop accepting connections
    pub async fn stop(&self) {
        if let Some(handle) = self.accept_task.lock().await.take() {
            handle.abort();
        }
    }
}

async fn handle_connection(state: &SimulatorState, mut stream: TcpStream) -> std::io::Result<()> {
    loop {
        let mut header = [0u8; MBAP_HEADER_LEN + 1];
        match stream.read_exact(&mut header).await {
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }

        let header = match MbapHeader::decode(&header) {
            Ok(header) => header,
            Err(e) => {
                debug!("Dropping connection: {}", e);
                return Ok(());
            },
        };

        let mut pdu = vec![0u8; header.pdu_len()];
        stream.read_exact(&mut pdu).await?;

        let response_pdu = handle_pdu(state, &pdu).await;

        if let Some(delay) = *state.response_delay.read().await {
            tokio::time::sleep(delay).await;
        }

        let response = encode_tcp_frame(header.transaction_id, header.unit_id, &response_pdu);
        stream.write_all(&response).await?;
    }
}

async fn handle_pdu(state: &SimulatorState, pdu: &[u8]) -> Vec<u8> {
    let Some(&function_code) = pdu.first() else {
        return exception(0, EXCEPTION_ILLEGAL_FUNCTION);
    };

    if pdu.len() != 5 {
        state
            .requests
            .lock()
            .await
            .push(SimulatorRequest::Unsupported { function_code });
        return exception(function_code, EXCEPTION_ILLEGAL_FUNCTION);
    }

    let address = u16::from_be_bytes([pdu[1], pdu[2]]);
    let word = u16::from_be_bytes([pdu[3], pdu[4]]);

    let request = match function_code {
        FC_READ_HOLDING_REGISTERS => SimulatorRequest::Read {
            bank: RegisterBank::Holding,
            start_offset: address,
            count: word,
        },
        FC_READ_INPUT_REGISTERS => SimulatorRequest::Read {
            bank: RegisterBank::Input,
            start_offset: address,
            count: word,
        },
        FC_WRITE_SINGLE_REGISTER => SimulatorRequest::Write {
            offset: address,
            value: word,
        },
        _ => SimulatorRequest::Unsupported { function_code },
    };
    state.requests.lock().await.push(request);

    if let Some(&code) = state.failing_functions.read().await.get(&function_code) {
        return exception(function_code, code);
    }

    match request {
        SimulatorRequest::Read {
            bank,
            start_offset,
            count,
        } => {
            if count == 0 || count > AIRFI_MAX_READ_REGISTERS {
                return exception(function_code, EXCEPTION_ILLEGAL_DATA_VALUE);
            }
            let registers = match bank {
                RegisterBank::Input => state.input_registers.read().await,
                RegisterBank::Holding => state.holding_registers.read().await,
            };
            let returned = if state.truncate_reads.load(Ordering::SeqCst) {
                count - 1
            } else {
                count
            };

            let mut response = Vec::with_capacity(2 + returned as usize * 2);
            response.push(function_code);
            response.push((returned * 2) as u8);
            for i in 0..returned {
                let value = registers
                    .get(&start_offset.saturating_add(i))
                    .copied()
                    .unwrap_or(0);
                response.extend_from_slice(&value.to_be_bytes());
            }
            response
        },
        SimulatorRequest::Write { offset, value } => {
            state.holding_registers.write().await.insert(offset, value);
            // Echo back the request
            pdu.to_vec()
        },
        SimulatorRequest::Unsupported { function_code } => {
            exception(function_code, EXCEPTION_ILLEGAL_FUNCTION)
        },
    }
}

fn exception(function_code: u8, code: u8) -> Vec<u8> {
    vec![function_code | 0x80, code]
}
