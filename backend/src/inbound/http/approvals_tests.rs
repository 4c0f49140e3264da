//! Handler tests for the approval workflow endpoints.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::domain::notification::REJECTION_SUBJECT;
use crate::domain::{ErrorCode, Role, UserId};
use crate::inbound::http::envelope::{Envelope, ErrorEnvelope};
use crate::inbound::http::test_utils::{TestHarness, login_cookie};

use super::*;

#[fixture]
fn harness() -> TestHarness {
    TestHarness::new()
}

async fn register_pending(harness: &TestHarness, username: &str) -> UserId {
    harness
        .state
        .accounts
        .register(crate::domain::test_fixtures::registration(
            username,
            &format!("{username}@x.com"),
        ))
        .await
        .expect("registration succeeds")
        .user_id
}

fn post(uri: &str, cookie: Cookie<'static>, body: &Value) -> actix_http::Request {
    actix_test::TestRequest::post()
        .uri(uri)
        .cookie(cookie)
        .set_json(body)
        .to_request()
}

fn get(uri: &str, cookie: Cookie<'static>) -> actix_http::Request {
    actix_test::TestRequest::get().uri(uri).cookie(cookie).to_request()
}

#[rstest]
#[actix_web::test]
async fn approving_advances_the_version_and_stale_retries_conflict(harness: TestHarness) {
    let admin = harness.seed_account("root", Role::Admin).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;
    let uri = format!("/api/v1/approvals/{alice}/approve");

    let response =
        actix_test::call_service(&app, post(&uri, cookie.clone(), &json!({ "expectedVersion": 1 })))
            .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Envelope<Approval> = actix_test::read_body_json(response).await;
    assert_eq!(body.data.status, ApprovalStatus::Approved);
    assert_eq!(body.data.version.get(), 2);
    assert_eq!(body.data.reviewer, Some(admin.to_string()));

    let retry =
        actix_test::call_service(&app, post(&uri, cookie, &json!({ "expectedVersion": 1 }))).await;
    assert_eq!(retry.status(), StatusCode::CONFLICT);
    let body: ErrorEnvelope = actix_test::read_body_json(retry).await;
    assert_eq!(body.data.error, ErrorCode::Conflict);
}

#[rstest]
#[actix_web::test]
async fn rejection_records_the_reason_and_emails_the_applicant(harness: TestHarness) {
    let admin = harness.seed_account("root", Role::Admin).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        post(
            &format!("/api/v1/approvals/{alice}/reject"),
            cookie,
            &json!({ "expectedVersion": 1, "comment": "incomplete profile" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Envelope<Approval> = actix_test::read_body_json(response).await;
    assert_eq!(body.data.status, ApprovalStatus::Rejected);
    assert_eq!(body.data.rejection_reason.as_deref(), Some("incomplete profile"));
    assert_eq!(body.data.reviewer, Some(admin.to_string()));
    let mut notified = false;
    for _ in 0..50 {
        if harness.notifier.subjects().iter().any(|s| s == REJECTION_SUBJECT) {
            notified = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(notified, "rejection email dispatched");
}

#[rstest]
#[actix_web::test]
async fn overlong_rejection_comments_are_invalid(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        post(
            &format!("/api/v1/approvals/{alice}/reject"),
            cookie,
            &json!({ "expectedVersion": 1, "comment": "x".repeat(300), "isCancel": true }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorEnvelope = actix_test::read_body_json(response).await;
    assert_eq!(body.data.error, ErrorCode::InvalidRequest);
    let details = body.data.details.expect("field details");
    assert_eq!(details["field"], "comment");
    assert_eq!(details["code"], "too_long");

    let approval = harness.state.approvals.approval(alice).await.expect("approval");
    assert_eq!(approval.status, ApprovalStatus::Pending);
    assert_eq!(approval.version.get(), 1);
}

#[rstest]
#[actix_web::test]
async fn zero_versions_are_invalid(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        post(
            &format!("/api/v1/approvals/{alice}/approve"),
            cookie,
            &json!({ "expectedVersion": 0 }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn regular_users_cannot_decide(harness: TestHarness) {
    harness.seed_account("bob", Role::User).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "bob").await;

    let response = actix_test::call_service(
        &app,
        post(
            &format!("/api/v1/approvals/{alice}/approve"),
            cookie.clone(),
            &json!({ "expectedVersion": 1 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listing = actix_test::call_service(&app, get("/api/v1/approvals", cookie)).await;
    assert_eq!(listing.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn users_read_their_own_status_only(harness: TestHarness) {
    let bob = harness.seed_account("bob", Role::User).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "bob").await;

    let own = actix_test::call_service(
        &app,
        get(&format!("/api/v1/approvals/{bob}/status"), cookie.clone()),
    )
    .await;
    assert_eq!(own.status(), StatusCode::OK);
    let body: Envelope<ApprovalStatusResponse> = actix_test::read_body_json(own).await;
    assert_eq!(body.data.status, ApprovalStatus::Approved);

    let other =
        actix_test::call_service(&app, get(&format!("/api/v1/approvals/{alice}/status"), cookie))
            .await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn administrators_list_and_fetch_approvals(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let alice = register_pending(&harness, "alice").await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let listing = actix_test::call_service(&app, get("/api/v1/approvals", cookie.clone())).await;
    assert_eq!(listing.status(), StatusCode::OK);
    let body: Envelope<Vec<Value>> = actix_test::read_body_json(listing).await;
    assert_eq!(body.data.len(), 2);
    assert!(body.data.iter().any(|item| item["username"] == "alice"
        && item["status"] == "pending"
        && item["firstName"] == "Alice"));

    let single =
        actix_test::call_service(&app, get(&format!("/api/v1/approvals/{alice}"), cookie.clone()))
            .await;
    assert_eq!(single.status(), StatusCode::OK);

    let missing = actix_test::call_service(
        &app,
        get(&format!("/api/v1/approvals/{}", UserId::random()), cookie.clone()),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed =
        actix_test::call_service(&app, get("/api/v1/approvals/not-a-uuid", cookie)).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn anonymous_callers_are_unauthorised(harness: TestHarness) {
    let app = actix_test::init_service(harness.app()).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/api/v1/approvals").to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
