// Serial Transport Implementation
// Carries SMP packets over a UART console using base64 line framing

use crate::smp::{encode_serial, max_serial_packet, SerialDecoder};
use crate::transport::{SmpTransport, TransportError, TransportKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

/// Default UART baud rate
pub const DEFAULT_BAUDRATE: u32 = 115_200;
/// Default maximum encoded frame size; a default frame is sent as one line
pub const DEFAULT_FRAME_SIZE: usize = 4096;

// ============================================================================
// SERIAL TRANSPORT CONFIG
// ============================================================================

/// Configuration for serial transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path, e.g. /dev/ttyACM0 or COM1
    pub port: String,
    pub baudrate: u32,
    /// Maximum encoded size of one packet, all lines included
    pub frame_size: usize,
    /// Maximum length of one framed line
    pub line_length: usize,
}

impl SerialConfig {
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            frame_size: DEFAULT_FRAME_SIZE,
            line_length: DEFAULT_FRAME_SIZE,
        }
    }

    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    pub fn with_frame_size(mut self, size: usize) -> Self {
        self.frame_size = size;
        self
    }

    pub fn with_line_length(mut self, length: usize) -> Self {
        self.line_length = length.max(8);
        self
    }

    /// Line length actually used; a line never outgrows the frame
    pub fn effective_line_length(&self) -> usize {
        self.line_length.min(self.frame_size).max(8)
    }
}

// ============================================================================
// SERIAL TRANSPORT
// ============================================================================

pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
    decoder: SerialDecoder,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
            decoder: SerialDecoder::new(),
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl SmpTransport for SerialTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        debug!("Opening {} at {} baud", self.config.port, self.config.baudrate);
        let stream = tokio_serial::new(&self.config.port, self.config.baudrate)
            .open_native_async()
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", self.config.port, e)))?;

        self.decoder.reset();
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        self.decoder.reset();
        Ok(())
    }

    async fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let max = self.max_unencoded_size();
        if packet.len() > max {
            return Err(TransportError::PayloadTooLarge { size: packet.len(), max });
        }

        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let framed = encode_serial(packet, self.config.effective_line_length());
        stream.write_all(&framed).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = [0u8; 512];
        loop {
            if let Some(packet) = self.decoder.next_packet()? {
                return Ok(packet);
            }
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            self.decoder.push(&buf[..n]);
        }
    }

    fn max_unencoded_size(&self) -> usize {
        max_serial_packet(self.config.frame_size, self.config.effective_line_length())
    }

    fn address(&self) -> String {
        self.config.port.clone()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }
}
