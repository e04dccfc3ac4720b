// Request Dispatcher - One request, one response, bounded by a timeout

use crate::session::{classify, Connection, ProgressSink, ProgressStatus, RequestOutcome};
use crate::smp::{encode_request, RawResponse, SmpRequest, SmpVersion};
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Errors carrying a request to the device and back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    ProtocolFraming(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response to {request} matches no known shape: {reason}")]
    Unclassifiable { request: &'static str, reason: String },
}

impl DispatchError {
    fn status(&self) -> ProgressStatus {
        match self {
            Self::Timeout(_) => ProgressStatus::Timeout,
            Self::ProtocolFraming(_) | Self::Unclassifiable { .. } => ProgressStatus::ProtocolError,
            Self::ConnectionLost(_) => ProgressStatus::LinkError,
            Self::NotConnected | Self::InvalidRequest(_) => ProgressStatus::Failed,
        }
    }
}

impl From<TransportError> for DispatchError {
    fn from(e: TransportError) -> Self {
        if e.is_framing_error() {
            Self::ProtocolFraming(e.to_string())
        } else {
            Self::ConnectionLost(e.to_string())
        }
    }
}

/// Progress status for a finished request
pub(crate) fn outcome_status<T>(result: &Result<RequestOutcome<T>, DispatchError>) -> ProgressStatus {
    match result {
        Ok(outcome) if outcome.is_success() => ProgressStatus::Ok,
        Ok(_) => ProgressStatus::ProtocolError,
        Err(e) => e.status(),
    }
}

impl Connection {
    /// Send `request` and classify the answer
    ///
    /// `timeout` overrides the session's request timeout. A timed out request
    /// is never resent, and any error leaves the connection Failed.
    pub async fn request<R: SmpRequest>(
        &mut self,
        request: &R,
        timeout: Option<Duration>,
        sink: &dyn ProgressSink,
    ) -> Result<RequestOutcome<R::Response>, DispatchError> {
        sink.begin(&format!("Waiting for response to {}...", R::NAME));
        let result = self.exchange(request, timeout).await;
        sink.finish(outcome_status(&result));
        result
    }

    /// `request` without progress notifications; used by chunked transfers
    pub(crate) async fn exchange<R: SmpRequest>(
        &mut self,
        request: &R,
        timeout: Option<Duration>,
    ) -> Result<RequestOutcome<R::Response>, DispatchError> {
        let response = self.round_trip(request, timeout).await?;
        classify::<R::Response>(&response).map_err(|e| {
            self.fault();
            error!("{} answered with an unclassifiable payload: {}", R::NAME, e);
            DispatchError::Unclassifiable {
                request: R::NAME,
                reason: e.to_string(),
            }
        })
    }

    async fn round_trip<R: SmpRequest>(
        &mut self,
        request: &R,
        timeout: Option<Duration>,
    ) -> Result<RawResponse, DispatchError> {
        let result = self.round_trip_inner(request, timeout).await;
        if result.is_err() {
            self.fault();
        }
        result
    }

    async fn round_trip_inner<R: SmpRequest>(
        &mut self,
        request: &R,
        timeout: Option<Duration>,
    ) -> Result<RawResponse, DispatchError> {
        if !self.is_connected() {
            return Err(DispatchError::NotConnected);
        }

        let sequence = self.next_sequence();
        let packet = encode_request(request, sequence, SmpVersion::V2)
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
        let max = self.max_unencoded_size();
        if packet.len() > max {
            return Err(DispatchError::InvalidRequest(format!(
                "{} is {} bytes, the link carries at most {}",
                R::NAME,
                packet.len(),
                max
            )));
        }

        let timeout = timeout.unwrap_or(self.request_timeout);
        debug!("TX {} seq={} {} bytes", R::NAME, sequence, packet.len());

        let transport = &mut self.transport;
        let received = tokio::time::timeout(timeout, async {
            transport.send(&packet).await?;
            transport.receive().await
        })
        .await
        .map_err(|_| DispatchError::Timeout(timeout))??;

        let response =
            RawResponse::decode(&received).map_err(|e| DispatchError::ProtocolFraming(e.to_string()))?;
        debug!("RX {} {} bytes", response.header, received.len());

        let header = &response.header;
        let expected = R::OPERATION.response();
        if header.operation != expected {
            return Err(DispatchError::ProtocolFraming(format!(
                "expected {:?}, got {:?}",
                expected, header.operation
            )));
        }
        if header.group != R::GROUP || header.command != R::COMMAND {
            return Err(DispatchError::ProtocolFraming(format!(
                "response for group {} command {} does not answer {}",
                header.group.0,
                header.command,
                R::NAME
            )));
        }
        if header.sequence != sequence {
            return Err(DispatchError::ProtocolFraming(format!(
                "sequence {} does not match request sequence {}",
                header.sequence, sequence
            )));
        }

        Ok(response)
    }
}
