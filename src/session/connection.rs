// Connection Manager - Own one live transport and its lifecycle
//
// A connection is opened explicitly, never retried automatically, and is
// marked Failed by the first error on it.

use crate::config::SessionOptions;
use crate::session::{ProgressSink, ProgressStatus};
use crate::transport::{build_transport, SmpTransport, TransportKind};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A connect or a request failed; the connection must be replaced
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Errors establishing a connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Timed out connecting after {0:?}")]
    Timeout(Duration),

    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

impl ConnectError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// A transport plus the request bookkeeping for it
///
/// Requests take `&mut self`, so at most one operation is in flight.
pub struct Connection {
    pub(crate) transport: Box<dyn SmpTransport>,
    state: ConnectionState,
    sequence: u8,
    pub(crate) request_timeout: Duration,
}

impl Connection {
    pub fn new(transport: Box<dyn SmpTransport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            sequence: rand::random(),
            request_timeout,
        }
    }

    /// Build the transport named by the session options, unopened
    pub fn from_options(options: &SessionOptions) -> Self {
        Self::new(build_transport(&options.transport), options.request_timeout)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn address(&self) -> String {
        self.transport.address()
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_unencoded_size(&self) -> usize {
        self.transport.max_unencoded_size()
    }

    /// Open the transport, giving up after `timeout`
    ///
    /// The sink sees one `begin` and exactly one `finish`. Expiry drops the
    /// pending attempt.
    pub async fn connect(&mut self, timeout: Duration, sink: &dyn ProgressSink) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Ok(());
        }

        let address = self.address();
        sink.begin(&format!("Connecting to {}...", address));
        self.state = ConnectionState::Connecting;

        match tokio::time::timeout(timeout, self.transport.connect()).await {
            Ok(Ok(())) => {
                self.state = ConnectionState::Connected;
                sink.finish(ProgressStatus::Ok);
                info!("Connected to {} over {}", address, self.kind());
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Failed;
                sink.finish(ProgressStatus::Failed);
                error!("Connecting to {} failed: {}", address, e);
                Err(ConnectError::TransportFailure(e.to_string()))
            }
            Err(_) => {
                self.state = ConnectionState::Failed;
                sink.finish(ProgressStatus::Timeout);
                if let Err(e) = self.transport.disconnect().await {
                    debug!("Cleanup after connect timeout failed: {}", e);
                }
                error!("Timed out connecting to {} after {:?}", address, timeout);
                Err(ConnectError::Timeout(timeout))
            }
        }
    }

    /// Close the transport; the connection returns to Disconnected
    pub async fn close(&mut self) {
        if let Err(e) = self.transport.disconnect().await {
            debug!("Disconnect from {} failed: {}", self.address(), e);
        }
        self.state = ConnectionState::Disconnected;
    }

    pub(crate) fn fault(&mut self) {
        if self.state != ConnectionState::Failed {
            debug!("Connection to {} marked failed", self.address());
        }
        self.state = ConnectionState::Failed;
    }

    pub(crate) fn next_sequence(&mut self) -> u8 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address())
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
