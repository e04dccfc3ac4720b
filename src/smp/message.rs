// Message - Typed request descriptors and raw response decoding
//
// A request is a plain serde struct composed with its routing data
// (group, command, operation) and the response type it expects.

use crate::smp::{GroupId, HeaderError, Operation, SmpHeader, SmpVersion, HEADER_SIZE};
use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors encoding or decoding a management message
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    #[error("Invalid header: {0}")]
    Header(#[from] HeaderError),

    #[error("Payload length mismatch: header says {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("CBOR encode failed: {0}")]
    Encode(String),

    #[error("CBOR decode failed: {0}")]
    Decode(String),
}

// ============================================================================
// REQUEST DESCRIPTOR
// ============================================================================

/// A typed management request
///
/// The request body is the serde representation of the implementing type.
pub trait SmpRequest: Serialize + Sync {
    /// Payload the server answers with on success
    ///
    /// `Default` is the answer to a bare success-coded error envelope.
    type Response: DeserializeOwned + Default + Serialize + fmt::Debug + Send;

    const GROUP: GroupId;
    const COMMAND: u8;
    const OPERATION: Operation;

    /// Short label used in progress output and logs
    const NAME: &'static str;
}

/// Encode a request into a complete packet (header and CBOR payload)
pub fn encode_request<R: SmpRequest>(
    request: &R,
    sequence: u8,
    version: SmpVersion,
) -> Result<Vec<u8>, MessageError> {
    let mut payload = Vec::new();
    ciborium::into_writer(request, &mut payload).map_err(|e| MessageError::Encode(e.to_string()))?;

    let length = u16::try_from(payload.len()).map_err(|_| MessageError::PayloadTooLarge(payload.len()))?;
    let header = SmpHeader {
        operation: R::OPERATION,
        version,
        flags: 0,
        length,
        group: R::GROUP,
        sequence,
        command: R::COMMAND,
    };

    let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len());
    packet.extend_from_slice(&header.encode());
    packet.extend_from_slice(&payload);
    Ok(packet)
}

// ============================================================================
// RAW RESPONSE
// ============================================================================

/// A decoded response whose payload has not been classified yet
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub header: SmpHeader,
    pub payload: Value,
}

impl RawResponse {
    pub fn new(header: SmpHeader, payload: Value) -> Self {
        Self { header, payload }
    }

    /// Decode a complete packet
    pub fn decode(packet: &[u8]) -> Result<Self, MessageError> {
        let header = SmpHeader::decode(packet)?;
        let body = &packet[HEADER_SIZE..];
        if body.len() != header.length as usize {
            return Err(MessageError::LengthMismatch {
                expected: header.length as usize,
                actual: body.len(),
            });
        }

        let payload = if body.is_empty() {
            Value::Map(Vec::new())
        } else {
            ciborium::from_reader(body).map_err(|e| MessageError::Decode(e.to_string()))?
        };

        Ok(Self { header, payload })
    }

    /// Look up a top-level key of a map payload
    pub fn field(&self, key: &str) -> Option<&Value> {
        map_get(&self.payload, key)
    }
}

/// Look up a text key in a CBOR map value
pub fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

/// Encode a response packet; used by loopback transports and tests
pub fn encode_response(header: SmpHeader, payload: &Value) -> Result<Vec<u8>, MessageError> {
    let mut body = Vec::new();
    ciborium::into_writer(payload, &mut body).map_err(|e| MessageError::Encode(e.to_string()))?;
    let header = SmpHeader {
        length: u16::try_from(body.len()).map_err(|_| MessageError::PayloadTooLarge(body.len()))?,
        ..header
    };
    let mut packet = header.encode().to_vec();
    packet.extend_from_slice(&body);
    Ok(packet)
}

// ============================================================================
// BYTE STRINGS
// ============================================================================

/// Binary data encoded as a CBOR byte string rather than an integer array
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BytesVisitor;

        impl<'de> serde::de::Visitor<'de> for BytesVisitor {
            type Value = Bytes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a byte string")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Bytes, E> {
                Ok(Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Bytes, E> {
                Ok(Bytes(v))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Bytes, A::Error> {
                let mut data = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    data.push(byte);
                }
                Ok(Bytes(data))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}
