// Transport Selector - Resolve exactly one link from the connection options
//
// Pure: builds descriptors and transport handles, never touches a device.

use crate::transport::{
    BleConfig, BleTransport, SerialConfig, SerialTransport, SmpTransport, TransportKind, UdpConfig,
    UdpTransport,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors in the user's transport selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("A transport option is required; one of [{}]", .0.join(", "))]
    MissingTransport(Vec<&'static str>),

    #[error("Transport options are mutually exclusive; got [{}]", .0.join(", "))]
    ConflictingTransports(Vec<&'static str>),

    #[error("Invalid value for {option}: {reason}")]
    InvalidValue { option: &'static str, reason: String },
}

// ============================================================================
// TRANSPORT OPTIONS
// ============================================================================

/// Raw connection fields as the user supplied them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    pub port: Option<String>,
    pub ble: Option<String>,
    pub ip: Option<String>,
    pub mtu: Option<usize>,
    pub baudrate: Option<u32>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    pub fn with_ble(mut self, address: &str) -> Self {
        self.ble = Some(address.to_string());
        self
    }

    pub fn with_ip(mut self, host: &str) -> Self {
        self.ip = Some(host.to_string());
        self
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = Some(baudrate);
        self
    }

    fn populated(&self) -> Vec<&'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let mut names = Vec::new();
        if present(&self.port) {
            names.push("--port");
        }
        if present(&self.ble) {
            names.push("--ble");
        }
        if present(&self.ip) {
            names.push("--ip");
        }
        names
    }
}

// ============================================================================
// TRANSPORT DESCRIPTOR
// ============================================================================

/// The one link selected for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportDescriptor {
    Serial {
        port: String,
        baudrate: Option<u32>,
        frame_size: Option<usize>,
    },
    Ble {
        address: String,
    },
    Udp {
        host: String,
        mtu: Option<usize>,
    },
}

impl TransportDescriptor {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Serial { .. } => TransportKind::Serial,
            Self::Ble { .. } => TransportKind::Ble,
            Self::Udp { .. } => TransportKind::Udp,
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { port, .. } => write!(f, "serial://{}", port),
            Self::Ble { address } => write!(f, "ble://{}", address),
            Self::Udp { host, .. } => write!(f, "udp://{}", host),
        }
    }
}

/// Resolve the single transport named by `options`
///
/// Tuning for transports that were not selected is ignored.
pub fn select_transport(options: &TransportOptions) -> Result<TransportDescriptor, ConfigurationError> {
    let populated = options.populated();
    match populated.len() {
        0 => return Err(ConfigurationError::MissingTransport(vec!["--port", "--ble", "--ip"])),
        1 => {}
        _ => return Err(ConfigurationError::ConflictingTransports(populated)),
    }

    if let Some(mtu) = options.mtu {
        if mtu == 0 {
            return Err(ConfigurationError::InvalidValue {
                option: "--mtu",
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    let take = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(port) = take(&options.port) {
        Ok(TransportDescriptor::Serial {
            port,
            baudrate: options.baudrate,
            frame_size: options.mtu,
        })
    } else if let Some(address) = take(&options.ble) {
        Ok(TransportDescriptor::Ble { address })
    } else if let Some(host) = take(&options.ip) {
        Ok(TransportDescriptor::Udp {
            host,
            mtu: options.mtu,
        })
    } else {
        Err(ConfigurationError::MissingTransport(vec!["--port", "--ble", "--ip"]))
    }
}

/// Construct the transport handle for a descriptor without opening it
pub fn build_transport(descriptor: &TransportDescriptor) -> Box<dyn SmpTransport> {
    match descriptor {
        TransportDescriptor::Serial {
            port,
            baudrate,
            frame_size,
        } => {
            let mut config = SerialConfig::new(port);
            if let Some(baudrate) = baudrate {
                config = config.with_baudrate(*baudrate);
            }
            if let Some(frame_size) = frame_size {
                // A user-supplied MTU bounds both the frame and each line
                config = config.with_frame_size(*frame_size).with_line_length(*frame_size);
            }
            Box::new(SerialTransport::new(config))
        }
        TransportDescriptor::Ble { address } => Box::new(BleTransport::new(BleConfig::new(address))),
        TransportDescriptor::Udp { host, mtu } => {
            let mut config = UdpConfig::new(host);
            if let Some(mtu) = mtu {
                config = config.with_mtu(*mtu);
            }
            Box::new(UdpTransport::new(config))
        }
    }
}
