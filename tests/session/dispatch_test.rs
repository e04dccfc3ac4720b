// Request Dispatcher Tests
// Round trips, timeouts, malformed responses and link failures

use crate::common::{connected, int, map, text, MockTransport, RecordingSink, Reply};
use smpmgr::session::{ConnectionState, DispatchError, NullSink, ProgressStatus, RequestOutcome};
use smpmgr::smp::requests::os::{EchoWrite, ResetWrite};
use smpmgr::smp::{encode_serial, GroupId, Operation, SmpHeader, SmpVersion};
use smpmgr::transport::TransportError;
use std::time::Duration;

// ============================================================================
// ROUND TRIPS
// ============================================================================

#[tokio::test]
async fn test_echo_round_trip() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![("r", text("hello"))])));
    let (mut conn, sent) = connected(transport).await;
    let sink = RecordingSink::default();

    let outcome = conn.request(&EchoWrite::new("hello"), None, &sink).await.unwrap();

    match outcome {
        RequestOutcome::Success(response) => assert_eq!(response.r, "hello"),
        other => panic!("expected success, got {:?}", other),
    }
    assert!(conn.is_connected());
    assert_eq!(sink.finishes(), vec![ProgressStatus::Ok]);

    let headers = sent.headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].operation, Operation::Write);
    assert_eq!(headers[0].group, GroupId::OS);
    assert_eq!(headers[0].command, 0);
    assert_eq!(headers[0].version, SmpVersion::V2);
}

#[tokio::test]
async fn test_sequence_numbers_advance() {
    let transport = MockTransport::new()
        .with_reply(Reply::Payload(map(vec![("r", text("a"))])))
        .with_reply(Reply::Payload(map(vec![("r", text("b"))])));
    let (mut conn, sent) = connected(transport).await;

    conn.request(&EchoWrite::new("a"), None, &NullSink).await.unwrap();
    conn.request(&EchoWrite::new("b"), None, &NullSink).await.unwrap();

    let headers = sent.headers();
    assert_eq!(headers[1].sequence, headers[0].sequence.wrapping_add(1));
}

#[tokio::test]
async fn test_error_answer_is_data_not_dispatch_error() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![(
        "err",
        map(vec![("group", int(0)), ("rc", int(2))]),
    )])));
    let (mut conn, _) = connected(transport).await;
    let sink = RecordingSink::default();

    let outcome = conn.request(&ResetWrite::default(), None, &sink).await.unwrap();

    assert!(matches!(outcome, RequestOutcome::GroupedError(_)));
    assert!(conn.is_connected());
    assert_eq!(sink.finishes(), vec![ProgressStatus::ProtocolError]);
}

// ============================================================================
// TIMEOUTS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_echo_times_out_against_slow_server() {
    let transport = MockTransport::new().with_reply(Reply::Delayed(
        Duration::from_secs(3),
        map(vec![("r", text("late"))]),
    ));
    let (mut conn, sent) = connected(transport).await;
    let sink = RecordingSink::default();

    let result = conn
        .request(&EchoWrite::new("late"), Some(Duration::from_secs(2)), &sink)
        .await;

    assert_eq!(result.unwrap_err(), DispatchError::Timeout(Duration::from_secs(2)));
    assert_eq!(conn.state(), ConnectionState::Failed);
    assert_eq!(sent.len(), 1, "a timed out request is never resent");
    assert_eq!(sink.finishes(), vec![ProgressStatus::Timeout]);
}

#[tokio::test(start_paused = true)]
async fn test_session_timeout_applies_without_override() {
    let transport = MockTransport::new().with_reply(Reply::Silent);
    let (mut conn, _) = connected(transport).await;

    let result = conn.request(&EchoWrite::new("x"), None, &NullSink).await;

    assert_eq!(result.unwrap_err(), DispatchError::Timeout(conn.request_timeout()));
}

#[tokio::test(start_paused = true)]
async fn test_override_extends_timeout() {
    let transport = MockTransport::new().with_reply(Reply::Delayed(
        Duration::from_secs(3),
        map(vec![("r", text("slow"))]),
    ));
    let (mut conn, _) = connected(transport).await;

    let outcome = conn
        .request(&EchoWrite::new("slow"), Some(Duration::from_secs(5)), &NullSink)
        .await
        .unwrap();

    assert!(outcome.is_success());
}

// ============================================================================
// MALFORMED RESPONSES
// ============================================================================

#[tokio::test]
async fn test_wrong_sequence_is_protocol_framing() {
    let transport = MockTransport::new().with_reply(Reply::WrongSequence(map(vec![("r", text("x"))])));
    let (mut conn, _) = connected(transport).await;
    let sink = RecordingSink::default();

    let err = conn.request(&EchoWrite::new("x"), None, &sink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ProtocolFraming(_)));
    assert_eq!(conn.state(), ConnectionState::Failed);
    assert_eq!(sink.finishes(), vec![ProgressStatus::ProtocolError]);
}

#[tokio::test]
async fn test_garbage_bytes_are_protocol_framing() {
    let transport = MockTransport::new().with_reply(Reply::Raw(vec![0xff, 0x00, 0x01]));
    let (mut conn, _) = connected(transport).await;

    let err = conn.request(&EchoWrite::new("x"), None, &NullSink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ProtocolFraming(_)));
}

#[tokio::test]
async fn test_framing_error_from_link_is_protocol_framing() {
    let transport = MockTransport::new().with_reply(Reply::Fail(TransportError::Framing(
        "bad start delimiter".to_string(),
    )));
    let (mut conn, _) = connected(transport).await;

    let err = conn.request(&EchoWrite::new("x"), None, &NullSink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ProtocolFraming(_)));
}

#[tokio::test]
async fn test_undecodable_cbor_is_protocol_framing() {
    let header = SmpHeader {
        operation: Operation::WriteResponse,
        version: SmpVersion::V2,
        flags: 0,
        length: 1,
        group: GroupId::OS,
        sequence: 0,
        command: 0,
    };
    let mut packet = header.encode().to_vec();
    packet.push(0xff);
    let transport = MockTransport::new().with_reply(Reply::Raw(packet));
    let (mut conn, _) = connected(transport).await;

    let err = conn.request(&EchoWrite::new("x"), None, &NullSink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ProtocolFraming(_)));
}

#[tokio::test]
async fn test_serial_frame_instead_of_packet_is_protocol_framing() {
    let framed = encode_serial(&[0u8; 8], 128);
    let transport = MockTransport::new().with_reply(Reply::Raw(framed));
    let (mut conn, _) = connected(transport).await;

    let err = conn.request(&EchoWrite::new("x"), None, &NullSink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ProtocolFraming(_)));
}

#[tokio::test]
async fn test_unclassifiable_payload_is_loud() {
    let transport = MockTransport::new().with_reply(Reply::Payload(map(vec![("unexpected", int(1))])));
    let (mut conn, _) = connected(transport).await;
    let sink = RecordingSink::default();

    let err = conn.request(&EchoWrite::new("x"), None, &sink).await.unwrap_err();

    match err {
        DispatchError::Unclassifiable { request, .. } => assert_eq!(request, "EchoWrite"),
        other => panic!("expected Unclassifiable, got {:?}", other),
    }
    assert_eq!(conn.state(), ConnectionState::Failed);
    assert_eq!(sink.finishes(), vec![ProgressStatus::ProtocolError]);
}

// ============================================================================
// LINK FAILURES
// ============================================================================

#[tokio::test]
async fn test_io_failure_is_connection_lost() {
    let transport = MockTransport::new().with_reply(Reply::Fail(TransportError::IoError(
        "device unplugged".to_string(),
    )));
    let (mut conn, _) = connected(transport).await;
    let sink = RecordingSink::default();

    let err = conn.request(&EchoWrite::new("x"), None, &sink).await.unwrap_err();

    assert!(matches!(err, DispatchError::ConnectionLost(_)));
    assert_eq!(sink.finishes(), vec![ProgressStatus::LinkError]);
}

#[tokio::test]
async fn test_requests_after_failure_are_not_connected() {
    let transport = MockTransport::new()
        .with_reply(Reply::Fail(TransportError::Closed))
        .with_reply(Reply::Payload(map(vec![("r", text("x"))])));
    let (mut conn, sent) = connected(transport).await;

    let _ = conn.request(&EchoWrite::new("x"), None, &NullSink).await;
    let second = conn.request(&EchoWrite::new("x"), None, &NullSink).await;

    assert_eq!(second.unwrap_err(), DispatchError::NotConnected);
    assert_eq!(sent.len(), 1);
}

#[tokio::test]
async fn test_oversized_request_is_rejected_before_sending() {
    let transport = MockTransport::new().with_max_size(32);
    let (mut conn, sent) = connected(transport).await;

    let err = conn
        .request(&EchoWrite::new(&"x".repeat(100)), None, &NullSink)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::InvalidRequest(_)));
    assert_eq!(sent.len(), 0);
}
