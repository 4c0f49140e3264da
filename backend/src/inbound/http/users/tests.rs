//! Handler tests for account administration.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::{JobMetadata, UserId};
use crate::domain::{CsvUpload, ErrorCode};
use crate::domain::ports::CreateJobRequest;
use crate::inbound::http::envelope::{Envelope, ErrorEnvelope};
use crate::inbound::http::test_utils::{TestHarness, login_cookie};

#[fixture]
fn harness() -> TestHarness {
    TestHarness::new()
}

#[rstest]
#[actix_web::test]
async fn promotion_applies_from_the_next_login(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let bob = harness.seed_account("bob", Role::User).await;
    let app = actix_test::init_service(harness.app()).await;
    let admin_cookie = login_cookie(&app, "root").await;
    let stale_cookie = login_cookie(&app, "bob").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{bob}/promote"))
            .cookie(admin_cookie)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Envelope<RoleResponse> = actix_test::read_body_json(response).await;
    assert_eq!(body.data.role, Role::Admin);

    let before = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/approvals")
            .cookie(stale_cookie)
            .to_request(),
    )
    .await;
    assert_eq!(before.status(), StatusCode::FORBIDDEN);

    let fresh_cookie = login_cookie(&app, "bob").await;
    let after = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/approvals")
            .cookie(fresh_cookie)
            .to_request(),
    )
    .await;
    assert_eq!(after.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn promoting_unknown_accounts_is_not_found(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{}/promote", UserId::random()))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn deleting_an_account_removes_its_approval(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let bob = harness.seed_account("bob", Role::User).await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{bob}"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let approval = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/approvals/{bob}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(approval.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn accounts_owning_jobs_cannot_be_deleted(harness: TestHarness) {
    harness.seed_account("root", Role::Admin).await;
    let bob = harness.seed_account("bob", Role::User).await;
    let problem = harness.seed_problem();
    harness
        .state
        .jobs
        .create_job_with_csv(CreateJobRequest {
            owner: bob,
            problem_id: problem,
            metadata: JobMetadata::default(),
            upload: CsvUpload::parse("train.csv", b"a,b\n1,2\n".to_vec()).expect("upload"),
        })
        .await
        .expect("job created");
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "root").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{bob}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ErrorEnvelope = actix_test::read_body_json(response).await;
    assert_eq!(body.data.error, ErrorCode::Conflict);
}

#[rstest]
#[actix_web::test]
async fn regular_users_cannot_administer_accounts(harness: TestHarness) {
    let bob = harness.seed_account("bob", Role::User).await;
    let app = actix_test::init_service(harness.app()).await;
    let cookie = login_cookie(&app, "bob").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{bob}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
