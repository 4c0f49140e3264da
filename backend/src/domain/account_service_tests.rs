//! Tests for the registration and approval workflow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;
use tokio::sync::mpsc;

use super::*;
use crate::domain::ports::{
    EmailMessage, MockAccountRepository, MockPasswordHasher, Notifier, NotifierError,
};
use crate::domain::test_fixtures::{approval, fixture_clock, registration, user};
use crate::domain::{EmailAddress, ErrorCode, PasswordDigest, RejectionReason};

struct ChannelNotifier(mpsc::UnboundedSender<EmailMessage>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        self.0
            .send(message.clone())
            .map_err(|err| NotifierError::transport(err.to_string()))
    }
}

struct Harness {
    service: ApprovalWorkflowService<MockAccountRepository>,
    outbox: mpsc::UnboundedReceiver<EmailMessage>,
}

impl Harness {
    async fn next_email(&mut self) -> EmailMessage {
        tokio::time::timeout(Duration::from_secs(2), self.outbox.recv())
            .await
            .expect("email dispatched in time")
            .expect("outbox open")
    }

    fn assert_no_email(&mut self) {
        assert!(self.outbox.try_recv().is_err(), "no email expected");
    }
}

fn hasher() -> MockPasswordHasher {
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .returning(|_| Ok(PasswordDigest::new("$argon2id$fixture")));
    hasher
}

fn harness(accounts: MockAccountRepository) -> Harness {
    let (tx, outbox) = mpsc::unbounded_channel();
    let admin = EmailAddress::new("admin@x.com").expect("admin email");
    let notifications = NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)), Some(admin));
    Harness {
        service: ApprovalWorkflowService::new(
            Arc::new(accounts),
            Arc::new(hasher()),
            notifications,
            fixture_clock(),
        ),
        outbox,
    }
}

fn version(value: i32) -> ApprovalVersion {
    ApprovalVersion::new(value).expect("valid version")
}

#[tokio::test]
async fn register_creates_pending_account_and_notifies_admin() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().times(1).returning(|_| Ok(None));
    accounts.expect_find_by_email().times(1).returning(|_| Ok(None));
    accounts
        .expect_create_account()
        .withf(|account| {
            account.user.username().as_ref() == "alice"
                && account.user.role() == Role::User
                && account.password.as_str() == "$argon2id$fixture"
        })
        .times(1)
        .returning(|account| {
            Ok(approval(account.user.id(), "alice", ApprovalStatus::Pending, 1))
        });
    let mut harness = harness(accounts);

    let outcome = harness
        .service
        .register(registration("alice", "alice@x.com"))
        .await
        .expect("registration succeeds");

    assert_eq!(outcome.kind, RegistrationKind::Created);
    assert_eq!(outcome.approval.status, ApprovalStatus::Pending);
    assert_eq!(outcome.approval.version.get(), 1);
    assert_eq!(outcome.approval.user_id, outcome.user_id);

    let email = harness.next_email().await;
    assert_eq!(email.to.as_ref(), "admin@x.com");
    assert!(email.body.contains("username: alice, email: alice@x.com"));
}

#[tokio::test]
async fn register_rejects_taken_username_before_email_lookup() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().times(1).returning(|_| {
        Ok(Some(crate::domain::UserCredentials {
            user: user(UserId::random(), "alice", "other@x.com", Role::User),
            password: PasswordDigest::new("digest"),
        }))
    });
    accounts.expect_find_by_email().never();
    accounts.expect_create_account().never();
    let mut harness = harness(accounts);

    let error = harness
        .service
        .register(registration("alice", "alice@x.com"))
        .await
        .expect_err("username taken");

    assert_eq!(error.code(), ErrorCode::RegistrationConflict);
    assert_eq!(error.message(), "username already taken");
    harness.assert_no_email();
}

#[rstest]
#[case::pending(Some(ApprovalStatus::Pending))]
#[case::approved(Some(ApprovalStatus::Approved))]
#[case::reregistered(Some(ApprovalStatus::ReRegistered))]
#[case::missing(None)]
#[tokio::test]
async fn register_rejects_email_unless_rejected(#[case] status: Option<ApprovalStatus>) {
    let existing_id = UserId::random();
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().returning(|_| Ok(None));
    accounts
        .expect_find_by_email()
        .returning(move |_| Ok(Some(user(existing_id, "old", "alice@x.com", Role::User))));
    accounts
        .expect_find_approval()
        .returning(move |id| Ok(status.map(|s| approval(*id, "old", s, 2))));
    accounts.expect_reregister().never();
    let harness = harness(accounts);

    let error = harness
        .service
        .register(registration("alice", "ALICE@x.com"))
        .await
        .expect_err("email taken");

    assert_eq!(error.code(), ErrorCode::RegistrationConflict);
    assert_eq!(error.message(), "email already registered");
}

#[tokio::test]
async fn register_overwrites_rejected_account() {
    let existing_id = UserId::random();
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().returning(|_| Ok(None));
    accounts
        .expect_find_by_email()
        .returning(move |_| Ok(Some(user(existing_id, "old", "alice@x.com", Role::User))));
    accounts
        .expect_find_approval()
        .returning(|id| Ok(Some(approval(*id, "old", ApprovalStatus::Rejected, 2))));
    accounts
        .expect_reregister()
        .withf(move |request| {
            request.user_id == existing_id
                && request.expected_version.get() == 2
                && request.username.as_ref() == "alice"
        })
        .times(1)
        .returning(|request| {
            Ok(Some(approval(
                request.user_id,
                "alice",
                ApprovalStatus::ReRegistered,
                3,
            )))
        });
    let mut harness = harness(accounts);

    let outcome = harness
        .service
        .register(registration("alice", "alice@x.com"))
        .await
        .expect("re-registration succeeds");

    assert_eq!(outcome.user_id, existing_id);
    assert_eq!(outcome.kind, RegistrationKind::ReRegistered);
    assert_eq!(outcome.approval.status, ApprovalStatus::ReRegistered);
    assert_eq!(outcome.approval.version.get(), 3);
    assert_eq!(harness.next_email().await.to.as_ref(), "admin@x.com");
}

#[tokio::test]
async fn register_reports_lost_reregistration_race() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().returning(|_| Ok(None));
    accounts
        .expect_find_by_email()
        .returning(|_| Ok(Some(user(UserId::random(), "old", "alice@x.com", Role::User))));
    accounts
        .expect_find_approval()
        .returning(|id| Ok(Some(approval(*id, "old", ApprovalStatus::Rejected, 2))));
    accounts.expect_reregister().returning(|_| Ok(None));
    let mut harness = harness(accounts);

    let error = harness
        .service
        .register(registration("alice", "alice@x.com"))
        .await
        .expect_err("lost race");

    assert_eq!(error.code(), ErrorCode::RegistrationConflict);
    harness.assert_no_email();
}

#[tokio::test]
async fn register_maps_unique_violation_to_registration_conflict() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_find_by_username().returning(|_| Ok(None));
    accounts.expect_find_by_email().returning(|_| Ok(None));
    accounts
        .expect_create_account()
        .returning(|_| Err(AccountRepositoryError::duplicate("users_username_key")));
    let harness = harness(accounts);

    let error = harness
        .service
        .register(registration("alice", "alice@x.com"))
        .await
        .expect_err("duplicate");

    assert_eq!(error.code(), ErrorCode::RegistrationConflict);
    assert!(error.details().is_none());
    assert!(!error.message().contains("users_username_key"));
}

#[rstest]
#[case(
    AccountRepositoryError::connection("tcp reset by 10.0.0.5:5432"),
    ErrorCode::ServiceUnavailable
)]
#[case(AccountRepositoryError::still_referenced("jobs_owner_id_fkey"), ErrorCode::Conflict)]
#[tokio::test]
async fn storage_details_stay_out_of_client_errors(
    #[case] failure: AccountRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_delete_account()
        .return_once(move |_| Err(failure));
    let harness = harness(accounts);

    let error = harness
        .service
        .delete_account(UserId::random())
        .await
        .expect_err("storage failure");

    assert_eq!(error.code(), expected);
    assert!(!error.message().contains("10.0.0.5"));
    assert!(!error.message().contains("jobs_owner_id_fkey"));
}

#[tokio::test]
async fn approve_returns_advanced_record() {
    let user_id = UserId::random();
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_transition_approval()
        .withf(move |t| {
            t.user_id == user_id
                && t.expected_version.get() == 1
                && t.status == ApprovalStatus::Approved
                && t.reviewer.as_deref() == Some("root")
        })
        .times(1)
        .returning(|t| {
            let mut record = approval(t.user_id, "alice", ApprovalStatus::Approved, 2);
            record.reviewer = t.reviewer.clone();
            Ok(Some(record))
        });
    let harness = harness(accounts);

    let record = harness
        .service
        .approve(user_id, " root ", version(1))
        .await
        .expect("approve succeeds");

    assert_eq!(record.status, ApprovalStatus::Approved);
    assert_eq!(record.version.get(), 2);
    assert_eq!(record.reviewer.as_deref(), Some("root"));
}

#[tokio::test]
async fn approve_with_stale_version_reports_both_versions() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_transition_approval().returning(|_| Ok(None));
    accounts
        .expect_find_approval()
        .returning(|id| Ok(Some(approval(*id, "alice", ApprovalStatus::Approved, 2))));
    let harness = harness(accounts);

    let error = harness
        .service
        .approve(UserId::random(), "root", version(1))
        .await
        .expect_err("stale version");

    assert_eq!(error.code(), ErrorCode::Conflict);
    let details = error.details().expect("details");
    assert_eq!(details["expectedVersion"], 1);
    assert_eq!(details["actualVersion"], 2);
}

#[tokio::test]
async fn approve_missing_account_is_not_found() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_transition_approval().returning(|_| Ok(None));
    accounts.expect_find_approval().returning(|_| Ok(None));
    let harness = harness(accounts);

    let error = harness
        .service
        .approve(UserId::random(), "root", version(1))
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn approve_requires_reviewer() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_transition_approval().never();
    let harness = harness(accounts);

    let error = harness
        .service
        .approve(UserId::random(), "  ", version(1))
        .await
        .expect_err("blank reviewer");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn reject_notifies_applicant_with_reason() {
    let user_id = UserId::random();
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_transition_approval()
        .withf(|t| t.reviewer.as_deref() == Some("admin-1"))
        .returning(|t| {
            let mut record = approval(t.user_id, "alice", ApprovalStatus::Rejected, 2);
            record.reviewer = t.reviewer.clone();
            record.rejection_reason = t.rejection_reason.clone();
            Ok(Some(record))
        });
    accounts
        .expect_find_by_id()
        .returning(|id| Ok(Some(user(*id, "alice", "alice@x.com", Role::User))));
    let mut harness = harness(accounts);

    let record = harness
        .service
        .reject(RejectionRequest {
            user_id,
            expected_version: version(1),
            reviewer: " admin-1 ".to_owned(),
            comment: RejectionReason::parse(" incomplete profile ").expect("valid reason"),
            is_cancel: false,
        })
        .await
        .expect("reject succeeds");

    assert_eq!(record.reviewer.as_deref(), Some("admin-1"));
    assert_eq!(record.rejection_reason.as_deref(), Some("incomplete profile"));
    let email = harness.next_email().await;
    assert_eq!(email.to.as_ref(), "alice@x.com");
    assert_eq!(email.subject, "[register fail]");
    assert!(email.body.contains("Reason: incomplete profile"));
}

#[tokio::test]
async fn cancelled_reject_sends_nothing() {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_transition_approval()
        .returning(|t| Ok(Some(approval(t.user_id, "alice", ApprovalStatus::Rejected, 2))));
    accounts.expect_find_by_id().never();
    let mut harness = harness(accounts);

    harness
        .service
        .reject(RejectionRequest {
            user_id: UserId::random(),
            expected_version: version(1),
            reviewer: "admin-1".to_owned(),
            comment: None,
            is_cancel: true,
        })
        .await
        .expect("reject succeeds");

    tokio::task::yield_now().await;
    harness.assert_no_email();
}

#[tokio::test]
async fn stale_reject_sends_nothing() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_transition_approval().returning(|_| Ok(None));
    accounts
        .expect_find_approval()
        .returning(|id| Ok(Some(approval(*id, "alice", ApprovalStatus::Approved, 3))));
    accounts.expect_find_by_id().never();
    let mut harness = harness(accounts);

    let error = harness
        .service
        .reject(RejectionRequest {
            user_id: UserId::random(),
            expected_version: version(2),
            reviewer: "admin-1".to_owned(),
            comment: RejectionReason::parse("late").expect("valid reason"),
            is_cancel: false,
        })
        .await
        .expect_err("stale");

    assert_eq!(error.code(), ErrorCode::Conflict);
    harness.assert_no_email();
}

#[tokio::test]
async fn reject_requires_a_reviewer() {
    let mut accounts = MockAccountRepository::new();
    accounts.expect_transition_approval().never();
    let harness = harness(accounts);

    let error = harness
        .service
        .reject(RejectionRequest {
            user_id: UserId::random(),
            expected_version: version(1),
            reviewer: " ".to_owned(),
            comment: None,
            is_cancel: true,
        })
        .await
        .expect_err("blank reviewer");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case(true, None)]
#[case(false, Some(ErrorCode::NotFound))]
#[tokio::test]
async fn promote_to_admin_requires_existing_user(
    #[case] updated: bool,
    #[case] expected: Option<ErrorCode>,
) {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_set_role()
        .withf(|_, role| *role == Role::Admin)
        .returning(move |_, _| Ok(updated));
    let harness = harness(accounts);

    let result = harness.service.promote_to_admin(UserId::random()).await;
    assert_eq!(result.err().map(|e| e.code()), expected);
}

#[tokio::test]
async fn delete_account_with_jobs_is_conflict() {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_delete_account()
        .returning(|_| Err(AccountRepositoryError::still_referenced("owns 2 jobs")));
    let harness = harness(accounts);

    let error = harness
        .service
        .delete_account(UserId::random())
        .await
        .expect_err("still referenced");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case(AccountRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(AccountRepositoryError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn repository_failures_map_to_domain_codes(
    #[case] failure: AccountRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_find_approval()
        .returning(move |_| Err(failure.clone()));
    let harness = harness(accounts);

    let error = harness
        .service
        .approval_status(UserId::random())
        .await
        .expect_err("repository failure");

    assert_eq!(error.code(), expected);
}

#[tokio::test]
async fn approval_status_reads_current_state() {
    let mut accounts = MockAccountRepository::new();
    accounts
        .expect_find_approval()
        .returning(|id| Ok(Some(approval(*id, "alice", ApprovalStatus::Pending, 1))));
    let harness = harness(accounts);

    let status = harness
        .service
        .approval_status(UserId::random())
        .await
        .expect("status");
    assert_eq!(status, ApprovalStatus::Pending);
}
