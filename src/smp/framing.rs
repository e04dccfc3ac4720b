// Framing - Packet delimiting for stream and datagram links
//
// Serial console framing wraps each packet as base64 text lines:
//
//   0x06 0x09 <base64 ...>\n      first line of a packet
//   0x04 0x14 <base64 ...>\n      continuation lines
//
// The decoded body is: length (u16 BE, packet + crc) | packet | crc16 (BE).
// BLE notifications carry raw packets that may be split at any point and
// are reassembled using the header length.

use crate::smp::{HeaderError, SmpHeader, HEADER_SIZE};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::debug;

/// Start-of-packet delimiter for serial framing
pub const SERIAL_START: [u8; 2] = [0x06, 0x09];
/// Continuation delimiter for serial framing
pub const SERIAL_CONTINUE: [u8; 2] = [0x04, 0x14];
/// Default maximum serial line length, delimiters and newline included
pub const DEFAULT_LINE_LENGTH: usize = 128;

/// Errors reassembling a framed packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Invalid base64 in frame: {0}")]
    InvalidBase64(String),

    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Frame length {0} too short for a packet")]
    TooShort(usize),

    #[error("Frame overran announced length {expected}: {actual} bytes")]
    Overrun { expected: usize, actual: usize },

    #[error("Invalid packet header: {0}")]
    InvalidHeader(#[from] HeaderError),
}

/// CRC-16/XMODEM (poly 0x1021, init 0)
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

// ============================================================================
// SERIAL ENCODING
// ============================================================================

/// Encode a packet as serial console lines no longer than `line_length`
pub fn encode_serial(packet: &[u8], line_length: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(packet.len() + 4);
    body.extend_from_slice(&((packet.len() + 2) as u16).to_be_bytes());
    body.extend_from_slice(packet);
    body.extend_from_slice(&crc16_xmodem(packet).to_be_bytes());

    let encoded = STANDARD.encode(&body);

    // Base64 chunks stay a multiple of 4 so every line decodes on its own
    let max_chunk = (line_length.saturating_sub(3) / 4 * 4).max(4);

    let mut out = Vec::with_capacity(encoded.len() + (encoded.len() / max_chunk + 1) * 3);
    for (i, chunk) in encoded.as_bytes().chunks(max_chunk).enumerate() {
        if i == 0 {
            out.extend_from_slice(&SERIAL_START);
        } else {
            out.extend_from_slice(&SERIAL_CONTINUE);
        }
        out.extend_from_slice(chunk);
        out.push(b'\n');
    }
    out
}

/// Largest packet that fits in a serial frame of `frame_size` encoded bytes
pub fn max_serial_packet(frame_size: usize, line_length: usize) -> usize {
    let per_line = (line_length.saturating_sub(3) / 4 * 4).max(4);
    let lines = (frame_size / line_length.max(4)).max(1);
    let base64_budget = lines * per_line;
    // base64 inflates by 4/3; the body adds length and crc
    (base64_budget / 4 * 3).saturating_sub(4)
}

// ============================================================================
// SERIAL DECODING
// ============================================================================

/// Incremental decoder for serial console framing
#[derive(Debug, Default)]
pub struct SerialDecoder {
    pending: Vec<u8>,
    body: Vec<u8>,
    in_packet: bool,
}

impl SerialDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer bytes read from the link
    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Discard any partial state
    pub fn reset(&mut self) {
        self.pending.clear();
        self.body.clear();
        self.in_packet = false;
    }

    /// Return the next complete packet, if one has been buffered
    ///
    /// Lines that carry no SMP delimiter are console output and are skipped.
    pub fn next_packet(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.starts_with(&SERIAL_START) {
                self.body.clear();
                self.in_packet = true;
            } else if line.starts_with(&SERIAL_CONTINUE) {
                if !self.in_packet {
                    debug!("Dropping continuation line outside of a packet");
                    continue;
                }
            } else {
                if !line.is_empty() {
                    debug!("Skipping console output: {}", String::from_utf8_lossy(&line));
                }
                continue;
            }

            let decoded = STANDARD
                .decode(&line[2..])
                .map_err(|e| self.fail(FrameError::InvalidBase64(e.to_string())))?;
            self.body.extend_from_slice(&decoded);

            if let Some(packet) = self.take_packet()? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    fn take_packet(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.body.len() < 2 {
            return Ok(None);
        }
        let expected = u16::from_be_bytes([self.body[0], self.body[1]]) as usize;
        if expected < 2 {
            return Err(self.fail(FrameError::TooShort(expected)));
        }
        let actual = self.body.len() - 2;
        if actual < expected {
            return Ok(None);
        }
        if actual > expected {
            return Err(self.fail(FrameError::Overrun { expected, actual }));
        }

        let framed = &self.body[2..];
        let (packet, crc) = framed.split_at(framed.len() - 2);
        let received = u16::from_be_bytes([crc[0], crc[1]]);
        let computed = crc16_xmodem(packet);
        if received != computed {
            return Err(self.fail(FrameError::CrcMismatch {
                expected: computed,
                actual: received,
            }));
        }

        let packet = packet.to_vec();
        self.body.clear();
        self.in_packet = false;
        Ok(Some(packet))
    }

    fn fail(&mut self, error: FrameError) -> FrameError {
        self.body.clear();
        self.in_packet = false;
        error
    }
}

// ============================================================================
// PACKET REASSEMBLY
// ============================================================================

/// Reassembles raw packets split across notifications
#[derive(Debug, Default)]
pub struct PacketAssembler {
    buffer: Vec<u8>,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Return the next complete packet once the header's length is satisfied
    ///
    /// An undecodable header discards everything buffered.
    pub fn next_packet(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }
        let size = match SmpHeader::decode(&self.buffer) {
            Ok(header) => header.packet_size(),
            Err(e) => {
                debug!("Dropping {} buffered bytes: {}", self.buffer.len(), e);
                self.buffer.clear();
                return Err(e.into());
            }
        };
        if self.buffer.len() < size {
            return Ok(None);
        }
        Ok(Some(self.buffer.drain(..size).collect()))
    }
}
