// Session - Global options plus the lazily opened device connection

use crate::commands::CommandError;
use crate::config::{GlobalArgs, SessionOptions};
use crate::session::{Connection, ConnectionState, NullSink, ProgressSink, RequestOutcome};
use crate::smp::SmpRequest;
use crate::transport::ConfigurationError;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// State shared by every command run against one device
///
/// The connection is opened on first use and reused until it fails. A
/// failed connection is discarded and the next command connects afresh.
pub struct Session {
    args: GlobalArgs,
    connection: Option<Connection>,
    sink: Arc<dyn ProgressSink>,
}

impl Session {
    pub fn new(args: GlobalArgs, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            args,
            connection: None,
            sink,
        }
    }

    /// A session without progress output
    pub fn quiet(args: GlobalArgs) -> Self {
        Self::new(args, Arc::new(NullSink))
    }

    /// Use `connection` instead of building one from the options
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn args(&self) -> &GlobalArgs {
        &self.args
    }

    /// Session options derived from the current global flags
    pub fn options(&self) -> Result<SessionOptions, ConfigurationError> {
        SessionOptions::from_args(&self.args)
    }

    pub fn sink(&self) -> Arc<dyn ProgressSink> {
        Arc::clone(&self.sink)
    }

    /// Current connection state, if a connection exists
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(Connection::state)
    }

    /// The open connection, connecting first if needed
    pub async fn connection(&mut self) -> Result<&mut Connection, CommandError> {
        let connection = match self.connection.take() {
            Some(connection) if connection.state() != ConnectionState::Failed => connection,
            Some(_) => {
                debug!("Discarding failed connection");
                Connection::from_options(&self.options()?)
            }
            None => Connection::from_options(&self.options()?),
        };

        let timeout = self.args.timeout;
        let sink = Arc::clone(&self.sink);
        let connection = self.connection.insert(connection);
        if !connection.is_connected() {
            connection.connect(timeout, sink.as_ref()).await?;
        }
        Ok(connection)
    }

    /// Send one request with the session's request timeout
    pub async fn request<R: SmpRequest>(
        &mut self,
        request: &R,
    ) -> Result<RequestOutcome<R::Response>, CommandError> {
        self.request_with_timeout(request, None).await
    }

    pub async fn request_with_timeout<R: SmpRequest>(
        &mut self,
        request: &R,
        timeout: Option<Duration>,
    ) -> Result<RequestOutcome<R::Response>, CommandError> {
        let sink = Arc::clone(&self.sink);
        let connection = self.connection().await?;
        Ok(connection.request(request, timeout, sink.as_ref()).await?)
    }

    /// Send a request and treat an error answer as a failure
    pub async fn call<R: SmpRequest>(&mut self, request: &R) -> Result<R::Response, CommandError> {
        Ok(self.request(request).await?.into_result()?)
    }

    /// Replace the global options wholesale
    ///
    /// A changed connection target closes the current connection.
    pub async fn reconfigure(&mut self, args: GlobalArgs) {
        let target_changed = self.args.transport_options() != args.transport_options()
            || self.args.timeout != args.timeout;
        self.args = args;
        if target_changed {
            self.close().await;
        }
    }

    /// Close and forget the connection
    pub async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}
