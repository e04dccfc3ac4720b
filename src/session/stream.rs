// Chunked Transfers - Lazy upload and download cursors
//
// Each `next().await` moves one chunk and yields the new offset. Offsets
// reported by the device must strictly increase and never pass the total.
// A cursor ends at the full transfer or at the first failure and yields
// nothing afterwards.

use crate::session::{
    Connection, DispatchError, ProgressSink, ProgressStatus, ProtocolError, RequestOutcome,
};
use crate::smp::requests::file::{FileDownload, FileUpload};
use crate::smp::requests::image::ImageUploadWrite;
use crate::smp::{encode_request, Bytes, SmpRequest};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Extra bytes a CBOR byte string header may take once data is added
const BSTR_HEADER_OVERHEAD: usize = 3;

/// Errors ending a chunked transfer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Device rejected chunk at offset {offset}: {error}")]
    Rejected { offset: u64, error: ProtocolError },
}

impl TransferError {
    fn status(&self) -> ProgressStatus {
        match self {
            Self::Dispatch(DispatchError::Timeout(_)) => ProgressStatus::Timeout,
            Self::Dispatch(DispatchError::ConnectionLost(_)) => ProgressStatus::LinkError,
            Self::Dispatch(_) | Self::Rejected { .. } => ProgressStatus::ProtocolError,
        }
    }
}

/// Tracks where a cursor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Done,
}

// ============================================================================
// UPLOAD
// ============================================================================

#[derive(Debug, Clone)]
enum UploadTarget {
    Image { image: Option<u32>, sha: Bytes },
    File { name: String },
}

impl UploadTarget {
    fn label(&self) -> String {
        match self {
            Self::Image { image: Some(image), .. } => format!("Uploading image {}", image),
            Self::Image { image: None, .. } => "Uploading image".to_string(),
            Self::File { name } => format!("Uploading {}", name),
        }
    }
}

/// Pushes a buffer to the device chunk by chunk
pub struct ChunkedUpload<'a> {
    connection: &'a mut Connection,
    sink: &'a dyn ProgressSink,
    data: &'a [u8],
    target: UploadTarget,
    offset: u64,
    chunk_size: usize,
    phase: Phase,
}

impl<'a> ChunkedUpload<'a> {
    /// Upload a firmware image to `image` (the device's default when `None`)
    pub fn image(
        connection: &'a mut Connection,
        data: &'a [u8],
        image: Option<u32>,
        sink: &'a dyn ProgressSink,
    ) -> Result<Self, TransferError> {
        let sha = Bytes(Sha256::digest(data).to_vec());
        Self::new(connection, data, UploadTarget::Image { image, sha }, sink)
    }

    /// Upload a file to `name` on the device's file system
    pub fn file(
        connection: &'a mut Connection,
        data: &'a [u8],
        name: &str,
        sink: &'a dyn ProgressSink,
    ) -> Result<Self, TransferError> {
        let target = UploadTarget::File {
            name: name.to_string(),
        };
        Self::new(connection, data, target, sink)
    }

    fn new(
        connection: &'a mut Connection,
        data: &'a [u8],
        target: UploadTarget,
        sink: &'a dyn ProgressSink,
    ) -> Result<Self, TransferError> {
        let total = data.len() as u64;

        // The first chunk carries the most metadata; size every chunk from it
        let overhead = match &target {
            UploadTarget::Image { image, sha } => encoded_len(&ImageUploadWrite {
                image: *image,
                len: Some(total),
                off: total,
                sha: Some(sha.clone()),
                data: Bytes::default(),
            })?,
            UploadTarget::File { name } => encoded_len(&FileUpload {
                off: total,
                data: Bytes::default(),
                name: name.clone(),
                len: Some(total),
            })?,
        } + BSTR_HEADER_OVERHEAD;

        let max = connection.max_unencoded_size();
        if overhead >= max {
            return Err(DispatchError::InvalidRequest(format!(
                "link carries {} bytes, chunk metadata alone needs {}",
                max, overhead
            ))
            .into());
        }

        Ok(Self {
            connection,
            sink,
            data,
            target,
            offset: 0,
            chunk_size: max - overhead,
            phase: Phase::Idle,
        })
    }

    pub fn total(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Send the next chunk and yield the offset the device acknowledged
    pub async fn next(&mut self) -> Option<Result<u64, TransferError>> {
        match self.phase {
            Phase::Done => return None,
            Phase::Idle => {
                self.sink.begin(&format!("{}...", self.target.label()));
                self.phase = Phase::Running;
            }
            Phase::Running => {}
        }

        let total = self.total();
        let start = self.offset as usize;
        let end = (start + self.chunk_size).min(self.data.len());
        let first = self.offset == 0;
        let chunk = Bytes::from(&self.data[start..end]);

        let outcome = match &self.target {
            UploadTarget::Image { image, sha } => {
                let request = ImageUploadWrite {
                    image: if first { *image } else { None },
                    len: first.then_some(total),
                    off: self.offset,
                    sha: if first { Some(sha.clone()) } else { None },
                    data: chunk,
                };
                self.connection
                    .exchange(&request, None)
                    .await
                    .map(|o| o.map(|r| r.off))
            }
            UploadTarget::File { name } => {
                let request = FileUpload {
                    off: self.offset,
                    data: chunk,
                    name: name.clone(),
                    len: first.then_some(total),
                };
                self.connection
                    .exchange(&request, None)
                    .await
                    .map(|o| o.map(|r| r.off))
            }
        };

        let result = match outcome {
            Ok(RequestOutcome::Success(off)) => self.accept(off),
            Ok(RequestOutcome::LegacyError(e)) => Err(TransferError::Rejected {
                offset: self.offset,
                error: ProtocolError::Legacy(e),
            }),
            Ok(RequestOutcome::GroupedError(e)) => Err(TransferError::Rejected {
                offset: self.offset,
                error: ProtocolError::Grouped(e),
            }),
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(offset) => {
                self.sink.advance(*offset, total);
                if *offset >= total {
                    self.phase = Phase::Done;
                    self.sink.finish(ProgressStatus::Ok);
                }
            }
            Err(e) => {
                self.phase = Phase::Done;
                self.sink.finish(e.status());
            }
        }
        Some(result)
    }

    fn accept(&mut self, off: u64) -> Result<u64, TransferError> {
        let total = self.total();
        let advanced = off > self.offset || (total == 0 && off == 0);
        if !advanced || off > total {
            self.connection.fault();
            return Err(DispatchError::ProtocolFraming(format!(
                "device acknowledged offset {} after {} of {} bytes",
                off, self.offset, total
            ))
            .into());
        }
        debug!("Chunk acknowledged at {}/{}", off, total);
        self.offset = off;
        Ok(off)
    }

    /// Drive the transfer to completion, returning the final offset
    pub async fn run(mut self) -> Result<u64, TransferError> {
        let mut last = 0;
        while let Some(step) = self.next().await {
            last = step?;
        }
        Ok(last)
    }
}

impl Drop for ChunkedUpload<'_> {
    fn drop(&mut self) {
        if self.phase == Phase::Running {
            self.connection.fault();
            self.sink.finish(ProgressStatus::Failed);
        }
    }
}

fn encoded_len<R: SmpRequest>(request: &R) -> Result<usize, TransferError> {
    encode_request(request, 0, crate::smp::SmpVersion::V2)
        .map(|packet| packet.len())
        .map_err(|e| DispatchError::InvalidRequest(e.to_string()).into())
}

// ============================================================================
// DOWNLOAD
// ============================================================================

/// Pulls a file from the device chunk by chunk
pub struct ChunkedDownload<'a> {
    connection: &'a mut Connection,
    sink: &'a dyn ProgressSink,
    name: String,
    offset: u64,
    total: Option<u64>,
    data: Vec<u8>,
    phase: Phase,
}

impl<'a> ChunkedDownload<'a> {
    pub fn file(connection: &'a mut Connection, name: &str, sink: &'a dyn ProgressSink) -> Self {
        Self {
            connection,
            sink,
            name: name.to_string(),
            offset: 0,
            total: None,
            data: Vec::new(),
            phase: Phase::Idle,
        }
    }

    /// File length, known once the first chunk has arrived
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fetch the next chunk and yield the offset reached
    pub async fn next(&mut self) -> Option<Result<u64, TransferError>> {
        match self.phase {
            Phase::Done => return None,
            Phase::Idle => {
                self.sink.begin(&format!("Downloading {}...", self.name));
                self.phase = Phase::Running;
            }
            Phase::Running => {}
        }

        let request = FileDownload {
            off: self.offset,
            name: self.name.clone(),
        };
        let result = match self.connection.exchange(&request, None).await {
            Ok(RequestOutcome::Success(chunk)) => self.accept(chunk.off, chunk.data, chunk.len),
            Ok(RequestOutcome::LegacyError(e)) => Err(TransferError::Rejected {
                offset: self.offset,
                error: ProtocolError::Legacy(e),
            }),
            Ok(RequestOutcome::GroupedError(e)) => Err(TransferError::Rejected {
                offset: self.offset,
                error: ProtocolError::Grouped(e),
            }),
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(offset) => {
                let total = self.total.unwrap_or(*offset);
                self.sink.advance(*offset, total);
                if *offset >= total {
                    self.phase = Phase::Done;
                    self.sink.finish(ProgressStatus::Ok);
                }
            }
            Err(e) => {
                self.phase = Phase::Done;
                self.sink.finish(e.status());
            }
        }
        Some(result)
    }

    fn accept(&mut self, off: u64, data: Bytes, len: Option<u64>) -> Result<u64, TransferError> {
        let framing = |conn: &mut Connection, reason: String| -> TransferError {
            conn.fault();
            DispatchError::ProtocolFraming(reason).into()
        };

        let total = match (self.total, len) {
            (Some(total), _) => total,
            (None, Some(len)) => {
                self.total = Some(len);
                len
            }
            (None, None) => {
                return Err(framing(
                    self.connection,
                    "first chunk does not carry the file length".to_string(),
                ))
            }
        };

        if off != self.offset {
            return Err(framing(
                self.connection,
                format!("device sent offset {}, expected {}", off, self.offset),
            ));
        }

        let next = self.offset + data.len() as u64;
        let advanced = next > self.offset || total == 0;
        if !advanced || next > total {
            return Err(framing(
                self.connection,
                format!("chunk moves offset {} to {} of {} bytes", self.offset, next, total),
            ));
        }

        self.data.extend_from_slice(data.as_slice());
        self.offset = next;
        Ok(next)
    }

    /// Bytes received so far
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Drive the download to completion and return the file contents
    pub async fn run(mut self) -> Result<Vec<u8>, TransferError> {
        while let Some(step) = self.next().await {
            step?;
        }
        Ok(self.into_data())
    }
}

impl Drop for ChunkedDownload<'_> {
    fn drop(&mut self) {
        if self.phase == Phase::Running {
            self.connection.fault();
            self.sink.finish(ProgressStatus::Failed);
        }
    }
}
