// SMP Header - The fixed 8-byte prefix of every management message
//
// Layout (big-endian):
//   byte 0: reserved(3) | version(2) | op(3)
//   byte 1: flags
//   byte 2-3: payload length
//   byte 4-5: group id
//   byte 6: sequence number
//   byte 7: command id

use crate::smp::GroupId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Size of the encoded header in bytes
pub const HEADER_SIZE: usize = 8;

/// Errors decoding a header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Header too short: {0} bytes")]
    TooShort(usize),

    #[error("Unknown operation: {0}")]
    UnknownOperation(u8),
}

// ============================================================================
// OPERATION
// ============================================================================

/// Management operation carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Read,
    ReadResponse,
    Write,
    WriteResponse,
}

impl Operation {
    pub fn from_bits(bits: u8) -> Result<Self, HeaderError> {
        match bits {
            0 => Ok(Self::Read),
            1 => Ok(Self::ReadResponse),
            2 => Ok(Self::Write),
            3 => Ok(Self::WriteResponse),
            other => Err(HeaderError::UnknownOperation(other)),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Self::Read => 0,
            Self::ReadResponse => 1,
            Self::Write => 2,
            Self::WriteResponse => 3,
        }
    }

    /// The operation a server answers this request operation with
    pub fn response(&self) -> Self {
        match self {
            Self::Read | Self::ReadResponse => Self::ReadResponse,
            Self::Write | Self::WriteResponse => Self::WriteResponse,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Self::ReadResponse | Self::WriteResponse)
    }
}

// ============================================================================
// VERSION
// ============================================================================

/// Protocol version carried in the header
///
/// `V1` servers report failures as a bare `rc`; `V2` servers scope
/// the return code to a group inside an `err` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmpVersion {
    V1,
    V2,
}

impl SmpVersion {
    fn from_bits(bits: u8) -> Self {
        if bits == 0 {
            Self::V1
        } else {
            Self::V2
        }
    }

    fn bits(&self) -> u8 {
        match self {
            Self::V1 => 0,
            Self::V2 => 1,
        }
    }
}

// ============================================================================
// HEADER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmpHeader {
    pub operation: Operation,
    pub version: SmpVersion,
    pub flags: u8,
    pub length: u16,
    pub group: GroupId,
    pub sequence: u8,
    pub command: u8,
}

impl SmpHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let length = self.length.to_be_bytes();
        let group = self.group.0.to_be_bytes();
        [
            (self.version.bits() << 3) | self.operation.bits(),
            self.flags,
            length[0],
            length[1],
            group[0],
            group[1],
            self.sequence,
            self.command,
        ]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::TooShort(bytes.len()));
        }

        Ok(Self {
            operation: Operation::from_bits(bytes[0] & 0x07)?,
            version: SmpVersion::from_bits((bytes[0] >> 3) & 0x03),
            flags: bytes[1],
            length: u16::from_be_bytes([bytes[2], bytes[3]]),
            group: GroupId(u16::from_be_bytes([bytes[4], bytes[5]])),
            sequence: bytes[6],
            command: bytes[7],
        })
    }

    /// Total packet size (header plus payload) announced by this header
    pub fn packet_size(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }
}

impl fmt::Display for SmpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} group={} cmd={} seq={} len={}",
            self.operation, self.group, self.command, self.sequence, self.length
        )
    }
}
