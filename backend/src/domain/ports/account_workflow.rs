//! Driving ports for registration and the approval workflow.
//!
//! Inbound adapters call these traits without knowing how accounts are stored
//! or how notifications are delivered.

use async_trait::async_trait;

use crate::domain::{
    Approval, ApprovalListing, ApprovalStatus, ApprovalVersion, Error, Registration,
    RejectionReason, UserId,
};

/// How a registration was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    /// A new account was created with a pending approval.
    Created,
    /// A rejected account on the same email was overwritten.
    ReRegistered,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub user_id: UserId,
    pub kind: RegistrationKind,
    pub approval: Approval,
}

/// Administrative rejection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionRequest {
    pub user_id: UserId,
    pub expected_version: ApprovalVersion,
    /// Administrator recorded on the approval.
    pub reviewer: String,
    pub comment: Option<RejectionReason>,
    /// Withdraws the request without notifying the applicant.
    pub is_cancel: bool,
}

/// Commands that mutate accounts and approvals.
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Register a new account, or re-register a rejected one.
    async fn register(&self, registration: Registration) -> Result<RegistrationOutcome, Error>;

    /// Approve an account at the expected version.
    async fn approve(
        &self,
        user_id: UserId,
        reviewer: &str,
        expected_version: ApprovalVersion,
    ) -> Result<Approval, Error>;

    /// Reject an account at the expected version.
    async fn reject(&self, request: RejectionRequest) -> Result<Approval, Error>;

    /// Grant the administrator role.
    async fn promote_to_admin(&self, user_id: UserId) -> Result<(), Error>;

    /// Delete an account together with its approval and login record.
    async fn delete_account(&self, user_id: UserId) -> Result<(), Error>;
}

/// Read-side queries over approvals.
#[async_trait]
pub trait AccountQuery: Send + Sync {
    /// Current approval status for an account.
    async fn approval_status(&self, user_id: UserId) -> Result<ApprovalStatus, Error>;

    /// Full approval record for an account.
    async fn approval(&self, user_id: UserId) -> Result<Approval, Error>;

    /// All approvals with their account details.
    async fn list_approvals(&self) -> Result<Vec<ApprovalListing>, Error>;
}
