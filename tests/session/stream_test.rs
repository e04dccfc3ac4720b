// Chunked Transfer Tests
// Upload offsets, early termination and download reassembly

use crate::common::{
    bytes, connected, field_bytes, field_u64, int, map, MockTransport, RecordingSink, Reply,
};
use sha2::{Digest, Sha256};
use smpmgr::session::{
    ChunkedDownload, ChunkedUpload, ConnectionState, DispatchError, NullSink, ProgressStatus,
    TransferError,
};
use smpmgr::transport::TransportError;

/// Acknowledge an upload chunk by advancing the offset over its data
fn ack() -> Reply {
    Reply::with(|request| {
        let off = field_u64(request, "off").unwrap();
        let len = field_bytes(request, "data").unwrap().len() as u64;
        map(vec![("off", int((off + len) as i64))])
    })
}

fn firmware(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// UPLOAD
// ============================================================================

#[tokio::test]
async fn test_upload_offsets_strictly_increase_to_total() {
    let data = firmware(1000);
    let mut transport = MockTransport::new().with_max_size(256);
    for _ in 0..32 {
        transport = transport.with_reply(ack());
    }
    let (mut conn, sent) = connected(transport).await;
    let sink = RecordingSink::default();

    let mut upload = ChunkedUpload::image(&mut conn, &data, None, &sink).unwrap();
    let mut offsets = Vec::new();
    while let Some(step) = upload.next().await {
        offsets.push(step.unwrap());
    }
    drop(upload);

    assert!(offsets.len() > 1);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*offsets.last().unwrap(), 1000);
    assert!(conn.is_connected());
    assert_eq!(sink.advances(), offsets);
    assert_eq!(sink.finishes(), vec![ProgressStatus::Ok]);

    // Every packet fits the link
    assert!(sent.packets().iter().all(|p| p.len() <= 256));

    // Only the first chunk carries the length and hash
    let payloads = sent.payloads();
    assert_eq!(field_u64(&payloads[0], "len"), Some(1000));
    assert_eq!(
        field_bytes(&payloads[0], "sha"),
        Some(Sha256::digest(&data).to_vec())
    );
    assert!(payloads[1..].iter().all(|p| field_u64(p, "len").is_none()));

    // Reassembled chunks equal the image
    let uploaded: Vec<u8> = payloads
        .iter()
        .flat_map(|p| field_bytes(p, "data").unwrap())
        .collect();
    assert_eq!(uploaded, data);
}

#[tokio::test]
async fn test_upload_yields_nothing_after_failure() {
    let data = firmware(600);
    let transport = MockTransport::new()
        .with_max_size(128)
        .with_reply(ack())
        .with_reply(Reply::Fail(TransportError::Closed))
        .with_reply(ack());
    let (mut conn, sent) = connected(transport).await;
    let sink = RecordingSink::default();

    let mut upload = ChunkedUpload::file(&mut conn, &data, "/lfs/data.bin", &sink).unwrap();
    assert!(upload.next().await.unwrap().is_ok());
    let failure = upload.next().await.unwrap();
    assert!(matches!(
        failure,
        Err(TransferError::Dispatch(DispatchError::ConnectionLost(_)))
    ));
    assert!(upload.next().await.is_none());
    assert!(upload.next().await.is_none());
    drop(upload);

    assert_eq!(sent.len(), 2);
    assert_eq!(conn.state(), ConnectionState::Failed);
    assert_eq!(sink.finishes(), vec![ProgressStatus::LinkError]);
}

#[tokio::test]
async fn test_upload_rejected_chunk_ends_transfer() {
    let data = firmware(300);
    let transport = MockTransport::new()
        .with_max_size(128)
        .with_reply(Reply::Payload(map(vec![(
            "err",
            map(vec![("group", int(8)), ("rc", int(10))]),
        )])));
    let (mut conn, _) = connected(transport).await;

    let mut upload = ChunkedUpload::file(&mut conn, &data, "/lfs/x", &NullSink).unwrap();
    let step = upload.next().await.unwrap();

    assert!(matches!(step, Err(TransferError::Rejected { offset: 0, .. })));
    assert!(upload.next().await.is_none());
}

#[tokio::test]
async fn test_upload_offset_that_does_not_advance_is_framing_error() {
    let data = firmware(300);
    let transport = MockTransport::new()
        .with_max_size(128)
        .with_reply(Reply::Payload(map(vec![("off", int(0))])));
    let (mut conn, _) = connected(transport).await;

    let result = ChunkedUpload::file(&mut conn, &data, "/lfs/x", &NullSink)
        .unwrap()
        .run()
        .await;

    assert!(matches!(
        result,
        Err(TransferError::Dispatch(DispatchError::ProtocolFraming(_)))
    ));
    assert_eq!(conn.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_upload_offset_past_total_is_framing_error() {
    let data = firmware(50);
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![("off", int(51))])));
    let (mut conn, _) = connected(transport).await;

    let result = ChunkedUpload::file(&mut conn, &data, "/lfs/x", &NullSink)
        .unwrap()
        .run()
        .await;

    assert!(matches!(
        result,
        Err(TransferError::Dispatch(DispatchError::ProtocolFraming(_)))
    ));
}

#[tokio::test]
async fn test_empty_upload_sends_one_chunk() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![("off", int(0))])));
    let (mut conn, sent) = connected(transport).await;

    let offset = ChunkedUpload::file(&mut conn, &[], "/lfs/empty", &NullSink)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(offset, 0);
    assert_eq!(sent.len(), 1);
}

#[tokio::test]
async fn test_dropping_unfinished_upload_fails_connection() {
    let data = firmware(600);
    let transport = MockTransport::new().with_max_size(128).with_reply(ack());
    let (mut conn, _) = connected(transport).await;
    let sink = RecordingSink::default();

    let mut upload = ChunkedUpload::image(&mut conn, &data, Some(1), &sink).unwrap();
    upload.next().await.unwrap().unwrap();
    drop(upload);

    assert_eq!(conn.state(), ConnectionState::Failed);
    assert_eq!(sink.finishes(), vec![ProgressStatus::Failed]);
}

#[tokio::test]
async fn test_upload_on_tiny_link_is_rejected() {
    let (mut conn, _) = connected(MockTransport::new().with_max_size(16)).await;

    let result = ChunkedUpload::file(&mut conn, &[1, 2, 3], "/lfs/x", &NullSink);

    assert!(matches!(
        result,
        Err(TransferError::Dispatch(DispatchError::InvalidRequest(_)))
    ));
}

// ============================================================================
// DOWNLOAD
// ============================================================================

#[tokio::test]
async fn test_download_reassembles_file() {
    let transport = MockTransport::new()
        .with_reply(Reply::Payload(map(vec![
            ("off", int(0)),
            ("data", bytes(b"hello ")),
            ("len", int(11)),
        ])))
        .with_reply(Reply::Payload(map(vec![("off", int(6)), ("data", bytes(b"world"))])));
    let (mut conn, sent) = connected(transport).await;
    let sink = RecordingSink::default();

    let data = ChunkedDownload::file(&mut conn, "/lfs/greeting", &sink)
        .run()
        .await
        .unwrap();

    assert_eq!(data, b"hello world");
    assert_eq!(sink.advances(), vec![6, 11]);
    assert_eq!(sink.finishes(), vec![ProgressStatus::Ok]);

    let payloads = sent.payloads();
    assert_eq!(field_u64(&payloads[1], "off"), Some(6));
    assert_eq!(
        smpmgr::smp::map_get(&payloads[0], "name").and_then(|v| v.as_text()),
        Some("/lfs/greeting")
    );
}

#[tokio::test]
async fn test_download_requires_length_in_first_chunk() {
    let transport = MockTransport::new()
        .with_reply(Reply::Payload(map(vec![("off", int(0)), ("data", bytes(b"abc"))])));
    let (mut conn, _) = connected(transport).await;

    let result = ChunkedDownload::file(&mut conn, "/lfs/x", &NullSink).run().await;

    assert!(matches!(
        result,
        Err(TransferError::Dispatch(DispatchError::ProtocolFraming(_)))
    ));
    assert_eq!(conn.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_download_of_missing_file_is_rejected() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![(
        "err",
        map(vec![("group", int(8)), ("rc", int(3))]),
    )])));
    let (mut conn, _) = connected(transport).await;

    let result = ChunkedDownload::file(&mut conn, "/lfs/missing", &NullSink).run().await;

    match result {
        Err(TransferError::Rejected { offset, error }) => {
            assert_eq!(offset, 0);
            assert!(error.to_string().contains("NOT_FOUND"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_of_empty_file() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![
        ("off", int(0)),
        ("data", bytes(b"")),
        ("len", int(0)),
    ])));
    let (mut conn, _) = connected(transport).await;

    let data = ChunkedDownload::file(&mut conn, "/lfs/empty", &NullSink).run().await.unwrap();

    assert!(data.is_empty());
    assert!(conn.is_connected());
}

#[tokio::test]
async fn test_download_with_unexpected_offset_is_framing_error() {
    let transport = MockTransport::new()
        .with_reply(Reply::Payload(map(vec![
            ("off", int(0)),
            ("data", bytes(b"abc")),
            ("len", int(6)),
        ])))
        .with_reply(Reply::Payload(map(vec![("off", int(1)), ("data", bytes(b"def"))])));
    let (mut conn, _) = connected(transport).await;

    let mut download = ChunkedDownload::file(&mut conn, "/lfs/x", &NullSink);
    assert_eq!(download.next().await.unwrap().unwrap(), 3);
    assert_eq!(download.total(), Some(6));
    assert!(download.next().await.unwrap().is_err());
    assert!(download.next().await.is_none());
    assert_eq!(download.data(), b"abc");
}
