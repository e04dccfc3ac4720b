// Session module - THE CORE
// Connection lifecycle, request dispatch, response classification and
// chunked transfers over a single transport

mod classify;
mod connection;
mod dispatch;
mod progress;
mod stream;

pub use classify::{
    classify, ClassifyError, GroupedError, LegacyError, ProtocolError, RequestOutcome,
};

pub use connection::{ConnectError, Connection, ConnectionState};

pub use dispatch::DispatchError;

pub use progress::{LogSink, NullSink, ProgressSink, ProgressStatus, SpinnerSink};

pub use stream::{ChunkedDownload, ChunkedUpload, TransferError};
