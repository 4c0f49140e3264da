//! Tests for domain error construction and serialisation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("who"), ErrorCode::Unauthorized)]
#[case(Error::not_approved("wait"), ErrorCode::NotApproved)]
#[case(Error::forbidden("no"), ErrorCode::Forbidden)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::registration_conflict("taken"), ErrorCode::RegistrationConflict)]
#[case(Error::conflict("stale"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_substitutes_blank_messages() {
    let error = Error::new(ErrorCode::InternalError, "");
    assert_eq!(error.message(), "unspecified error");
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let error = TraceId::scope(trace_id, async move { Error::conflict("stale version") }).await;

    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn try_from_error_dto_clears_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let dto = ErrorDto {
        code: ErrorCode::InvalidRequest,
        message: "bad".to_owned(),
        trace_id: None,
        details: None,
    };

    let error = TraceId::scope(trace_id, async move {
        Error::try_from(dto).expect("conversion succeeds for valid payload without trace")
    })
    .await;

    assert!(error.trace_id().is_none());
}

#[rstest]
fn serialises_with_camel_case_fields(expected_trace_id: String) {
    let error = Error::conflict("approval version conflict")
        .with_trace_id(expected_trace_id)
        .with_details(json!({ "expectedVersion": 1, "actualVersion": 2 }));

    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "approval version conflict",
            "traceId": TRACE_ID,
            "details": { "expectedVersion": 1, "actualVersion": 2 },
        })
    );
}

#[rstest]
fn deserialisation_rejects_blank_messages() {
    let payload = json!({ "code": "not_found", "message": " " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
#[case(ErrorCode::Conflict, true)]
#[case(ErrorCode::RegistrationConflict, true)]
#[case(ErrorCode::Forbidden, false)]
fn conflict_family_membership(#[case] code: ErrorCode, #[case] expected: bool) {
    assert_eq!(code.is_conflict(), expected);
}
