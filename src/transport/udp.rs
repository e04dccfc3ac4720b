// UDP Transport Implementation
// One datagram carries exactly one SMP packet

use crate::transport::{SmpTransport, TransportError, TransportKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

/// Port SMP servers listen on by default
pub const DEFAULT_UDP_PORT: u16 = 1337;
/// Default datagram size budget
pub const DEFAULT_UDP_MTU: usize = 1024;

// ============================================================================
// UDP TRANSPORT CONFIG
// ============================================================================

/// Configuration for UDP transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Host name or address, optionally with `:port`
    pub host: String,
    pub port: u16,
    pub mtu: usize,
}

impl UdpConfig {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_UDP_PORT,
            mtu: DEFAULT_UDP_MTU,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// The `host:port` string to resolve
    ///
    /// An explicit port in `host` wins over the configured one.
    pub fn target(&self) -> String {
        if self.host.parse::<SocketAddr>().is_ok() {
            return self.host.clone();
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return SocketAddr::new(ip, self.port).to_string();
        }
        match self.host.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => self.host.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

// ============================================================================
// UDP TRANSPORT
// ============================================================================

pub struct UdpTransport {
    config: UdpConfig,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(config: UdpConfig) -> Self {
        Self { config, socket: None }
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }
}

#[async_trait]
impl SmpTransport for UdpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let target = self.config.target();
        let peer = lookup_host(&target)
            .await
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", target, e)))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(target.clone()))?;

        let bind: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("UDP socket {:?} connected to {}", socket.local_addr().ok(), peer);
        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.socket = None;
        Ok(())
    }

    async fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        if packet.len() > self.config.mtu {
            return Err(TransportError::PayloadTooLarge {
                size: packet.len(),
                max: self.config.mtu,
            });
        }
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        socket.send(packet).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        let mut buf = vec![0u8; u16::MAX as usize];
        let n = socket.recv(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    fn max_unencoded_size(&self) -> usize {
        self.config.mtu
    }

    fn address(&self) -> String {
        self.config.target()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }
}
