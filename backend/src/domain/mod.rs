//! Domain primitives, aggregates and services.
//!
//! Purpose: Define strongly typed entities for accounts, approvals and jobs,
//! and the services that enforce the approval workflow and job ownership.
//! Adapters reach the domain only through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - ApprovalWorkflowService, AccountLoginService, JobService: driving port
//!   implementations wired by the server.

pub mod account_service;
pub mod approval;
pub mod auth;
pub mod csv_artifact;
pub mod error;
pub mod job;
pub mod job_service;
pub mod login_record;
pub mod login_service;
pub mod notification;
mod password;
pub mod ports;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::account_service::ApprovalWorkflowService;
pub use self::approval::{
    Approval, ApprovalListing, ApprovalStatus, ApprovalTransition, ApprovalVersion,
    InvalidApprovalVersion, REJECTION_REASON_MAX, RejectionReason, RejectionReasonTooLong,
    UnknownApprovalStatus,
};
pub use self::auth::{
    AuthenticatedUser, LoginCredentials, LoginValidationError, Principal, Registration,
    RegistrationValidationError,
};
pub use self::csv_artifact::{
    CsvFile, CsvFileId, CsvFileMetadata, CsvUpload, CsvValidationError, MAX_CSV_BYTES,
    NewCsvFile, sha256_hex,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::job::{
    DEFAULT_JOB_PHASE, Job, JobDeletion, JobId, JobMetadata, JobMetadataError, JobStatus,
    MetricsId, NewJob, ProblemId, UnknownJobStatus,
};
pub use self::job_service::JobService;
pub use self::login_record::{LoginRecord, parse_peer_ip};
pub use self::login_service::AccountLoginService;
pub use self::notification::NotificationDispatcher;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    AccountStatus, EmailAddress, PasswordDigest, Role, User, UserCredentials, UserId,
    UserProfile, UserValidationError, Username,
};
