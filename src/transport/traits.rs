// Transport Traits and Core Types
// Defines the abstract SmpTransport trait and the errors shared by all links

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// TRANSPORT KIND
// ============================================================================

/// The physical link a transport drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Serial,
    Ble,
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Ble => write!(f, "ble"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Link closed")]
    Closed,

    #[error("IO error: {0}")]
    IoError(String),
}

impl TransportError {
    /// Check if this error happened while establishing the link
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::InvalidAddress(_)
                | Self::HardwareUnavailable(_)
                | Self::Unsupported(_)
        )
    }

    /// Check if the bytes on the link did not form a valid packet
    pub fn is_framing_error(&self) -> bool {
        matches!(self, Self::Framing(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<crate::smp::FrameError> for TransportError {
    fn from(e: crate::smp::FrameError) -> Self {
        Self::Framing(e.to_string())
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// A link that carries complete management packets
///
/// Implementations own their framing: `send` takes one packet (header and
/// payload) and `receive` yields exactly one.
#[async_trait]
pub trait SmpTransport: Send {
    /// Open the link
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the link; closing an unopened link is not an error
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Send one packet
    async fn send(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next complete packet
    async fn receive(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Largest packet the link can carry in one message
    fn max_unencoded_size(&self) -> usize;

    /// Human-readable peer address
    fn address(&self) -> String;

    fn kind(&self) -> TransportKind;
}
