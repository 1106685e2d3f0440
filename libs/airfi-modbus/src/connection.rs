//! Modbus TCP connection
//!
//! One socket to the controller. Every connect, send and receive is bounded
//! by the configured timeout.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::constants::{MAX_MBAP_LENGTH, MBAP_HEADER_LEN};
use crate::error::{ModbusLinkError, Result};

/// Open TCP connection to a controller
#[derive(Debug)]
pub struct ModbusConnection {
    stream: TcpStream,
    peer: String,
}

impl ModbusConnection {
    /// Create a TCP connection
    pub async fn connect_tcp(host: &str, port: u16, timeout_duration: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        debug!("TCP connecting: {}", addr);

        match timeout(timeout_duration, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("TCP_NODELAY: {}", e);
                }
                debug!("TCP connected: {}", addr);
                Ok(Self { stream, peer: addr })
            },
            Ok(Err(e)) => {
                error!("TCP err: {} - {}", addr, e);
                Err(ModbusLinkError::Connection(format!(
                    "Failed to connect to {addr}: {e}"
                )))
            },
            Err(_) => {
                warn!("TCP timeout: {}", addr);
                Err(ModbusLinkError::Timeout(format!(
                    "Connection to {addr} timed out"
                )))
            },
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send a complete frame
    pub async fn send(&mut self, data: &[u8], timeout_duration: Duration) -> Result<()> {
        match timeout(timeout_duration, self.stream.write_all(data)).await {
            Ok(Ok(())) => {
                debug!("TCP TX: {}B", data.len());
                Ok(())
            },
            Ok(Err(e)) => {
                error!("TCP TX: {}", e);
                Err(ModbusLinkError::Io(format!("TCP send error: {e}")))
            },
            Err(_) => Err(ModbusLinkError::Timeout("TCP send timeout".to_string())),
        }
    }

    /// Receive one complete Modbus TCP frame
    pub async fn receive(&mut self, timeout_duration: Duration) -> Result<Vec<u8>> {
        // [Transaction ID(2)][Protocol ID(2)][Length(2)][Unit ID(1)][PDU(N)]
        let mut header = [0u8; MBAP_HEADER_LEN];
        match timeout(timeout_duration, self.stream.read_exact(&mut header)).await {
            Ok(Ok(_)) => {},
            Ok(Err(e)) => {
                error!("TCP header RX: {}", e);
                return Err(ModbusLinkError::Io(format!("TCP header read error: {e}")));
            },
            Err(_) => {
                debug!("TCP header timeout");
                return Err(ModbusLinkError::Timeout(
                    "TCP header read timeout".to_string(),
                ));
            },
        }

        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        if length == 0 || length > MAX_MBAP_LENGTH {
            error!("TCP invalid len: {}", length);
            return Err(ModbusLinkError::Protocol(format!(
                "Invalid TCP frame length: {length}"
            )));
        }

        let total_size = MBAP_HEADER_LEN + length;
        let mut frame = vec![0u8; total_size];
        frame[..MBAP_HEADER_LEN].copy_from_slice(&header);

        match timeout(
            timeout_duration,
            self.stream.read_exact(&mut frame[MBAP_HEADER_LEN..]),
        )
        .await
        {
            Ok(Ok(_)) => {
                debug!("TCP RX: {}B", total_size);
                Ok(frame)
            },
            Ok(Err(e)) => {
                error!("TCP PDU RX: {}", e);
                Err(ModbusLinkError::Io(format!("TCP PDU read error: {e}")))
            },
            Err(_) => {
                debug!("TCP PDU timeout");
                Err(ModbusLinkError::Timeout("TCP PDU read timeout".to_string()))
            },
        }
    }

    /// Close the socket
    pub async fn shutdown(mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(|e| {
            debug!("TCP shutdown: {}", e);
            ModbusLinkError::Io(format!("TCP shutdown error: {e}"))
        })
    }
}
