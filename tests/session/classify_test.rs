// Error Classifier Tests
// Success, legacy and grouped shapes, and the unclassifiable defect

use crate::common::{int, map, text};
use ciborium::value::Value;
use smpmgr::session::{classify, ClassifyError, GroupedError, LegacyError, ProtocolError, RequestOutcome};
use smpmgr::smp::requests::image::ImageStatesReadResponse;
use smpmgr::smp::requests::os::{EchoWriteResponse, ResetWriteResponse};
use smpmgr::smp::{GroupId, Operation, RawResponse, SmpHeader, SmpVersion};

fn response(group: GroupId, payload: Value) -> RawResponse {
    let header = SmpHeader {
        operation: Operation::WriteResponse,
        version: SmpVersion::V2,
        flags: 0,
        length: 0,
        group,
        sequence: 7,
        command: 0,
    };
    RawResponse::new(header, payload)
}

// ============================================================================
// SUCCESS
// ============================================================================

#[test]
fn test_plain_payload_is_success() {
    let raw = response(GroupId::OS, map(vec![("r", text("hi"))]));

    let outcome = classify::<EchoWriteResponse>(&raw).unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Success(EchoWriteResponse { r: "hi".to_string() })
    );
}

#[test]
fn test_empty_payload_is_success_for_empty_response() {
    let raw = response(GroupId::OS, map(vec![]));

    let outcome = classify::<ResetWriteResponse>(&raw).unwrap();

    assert!(outcome.is_success());
}

#[test]
fn test_legacy_rc_zero_is_success() {
    let raw = response(GroupId::OS, map(vec![("rc", int(0)), ("r", text("hi"))]));

    let outcome = classify::<EchoWriteResponse>(&raw).unwrap();

    assert!(outcome.is_success());
}

#[test]
fn test_grouped_rc_zero_is_success() {
    let raw = response(
        GroupId::IMAGE,
        map(vec![
            ("err", map(vec![("group", int(1)), ("rc", int(0))])),
            ("images", Value::Array(vec![])),
        ]),
    );

    let outcome = classify::<ImageStatesReadResponse>(&raw).unwrap();

    assert!(outcome.is_success());
}

#[test]
fn test_bare_legacy_rc_zero_is_success_with_required_fields() {
    let raw = response(GroupId::OS, map(vec![("rc", int(0))]));

    let outcome = classify::<EchoWriteResponse>(&raw).unwrap();

    assert_eq!(outcome, RequestOutcome::Success(EchoWriteResponse::default()));
}

#[test]
fn test_bare_grouped_rc_zero_is_success_with_required_fields() {
    let raw = response(
        GroupId::OS,
        map(vec![("err", map(vec![("group", int(0)), ("rc", int(0))]))]),
    );

    let outcome = classify::<EchoWriteResponse>(&raw).unwrap();

    assert_eq!(outcome, RequestOutcome::Success(EchoWriteResponse::default()));
}

#[test]
fn test_rc_zero_with_partial_body_is_unclassifiable() {
    let raw = response(GroupId::OS, map(vec![("rc", int(0)), ("other", int(1))]));

    let result = classify::<EchoWriteResponse>(&raw);

    assert!(matches!(result, Err(ClassifyError::Unclassifiable(_))));
}

// ============================================================================
// ERROR SHAPES
// ============================================================================

#[test]
fn test_top_level_rc_is_legacy_error() {
    let raw = response(GroupId::OS, map(vec![("rc", int(3)), ("rsn", text("busy"))]));

    let outcome = classify::<EchoWriteResponse>(&raw).unwrap();

    let expected = LegacyError {
        group: GroupId::OS,
        rc: 3,
        rsn: Some("busy".to_string()),
    };
    assert_eq!(outcome, RequestOutcome::LegacyError(expected.clone()));
    assert_eq!(expected.rc_name(), Some("EINVAL"));
    assert!(expected.to_string().contains("busy"));
}

#[test]
fn test_err_map_is_grouped_error() {
    let raw = response(
        GroupId::IMAGE,
        map(vec![("err", map(vec![("group", int(1)), ("rc", int(3))]))]),
    );

    let outcome = classify::<ImageStatesReadResponse>(&raw).unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::GroupedError(GroupedError {
            group: GroupId::IMAGE,
            rc: 3,
        })
    );
}

#[test]
fn test_grouped_error_uses_group_rc_names() {
    let error = GroupedError {
        group: GroupId::IMAGE,
        rc: 3,
    };

    assert_eq!(error.rc_name(), GroupId::IMAGE.rc_name(3));
    assert!(error.to_string().contains("rc=3"));
}

#[test]
fn test_into_result_converts_error_shapes() {
    let legacy: RequestOutcome<()> = RequestOutcome::LegacyError(LegacyError {
        group: GroupId::OS,
        rc: 1,
        rsn: None,
    });
    let grouped: RequestOutcome<()> = RequestOutcome::GroupedError(GroupedError {
        group: GroupId::OS,
        rc: 1,
    });

    assert!(matches!(legacy.into_result(), Err(ProtocolError::Legacy(_))));
    assert!(matches!(grouped.into_result(), Err(ProtocolError::Grouped(_))));
    assert_eq!(RequestOutcome::Success(5).into_result(), Ok(5));
}

#[test]
fn test_map_preserves_error_shapes() {
    let outcome: RequestOutcome<u32> = RequestOutcome::Success(2);
    assert_eq!(outcome.map(|v| v * 2), RequestOutcome::Success(4));

    let error: RequestOutcome<u32> = RequestOutcome::GroupedError(GroupedError {
        group: GroupId::FILE,
        rc: 4,
    });
    assert!(matches!(error.map(|v| v * 2), RequestOutcome::GroupedError(_)));
}

// ============================================================================
// UNCLASSIFIABLE
// ============================================================================

#[test]
fn test_missing_fields_are_unclassifiable() {
    let raw = response(GroupId::OS, map(vec![("other", int(1))]));

    let result = classify::<EchoWriteResponse>(&raw);

    assert!(matches!(result, Err(ClassifyError::Unclassifiable(_))));
}

#[test]
fn test_non_map_payload_is_unclassifiable() {
    let raw = response(GroupId::OS, Value::Array(vec![int(1)]));

    let result = classify::<ResetWriteResponse>(&raw);

    assert!(matches!(result, Err(ClassifyError::Unclassifiable(_))));
}

#[test]
fn test_malformed_err_map_is_unclassifiable() {
    let raw = response(GroupId::OS, map(vec![("err", text("bad"))]));

    let result = classify::<ResetWriteResponse>(&raw);

    assert!(matches!(result, Err(ClassifyError::Unclassifiable(_))));
}

#[test]
fn test_non_integer_rc_is_unclassifiable() {
    let raw = response(GroupId::OS, map(vec![("rc", text("zero"))]));

    let result = classify::<ResetWriteResponse>(&raw);

    assert!(matches!(result, Err(ClassifyError::Unclassifiable(_))));
}
