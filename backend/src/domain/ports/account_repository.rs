//! Port for account persistence: credentials, profiles and approvals.
//!
//! A user row and its approval row are always written together, so one port
//! owns both. Approval writes are conditional on the stored version; adapters
//! must apply them as a single compare-and-swap statement rather than a read
//! followed by a write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Approval, ApprovalListing, ApprovalTransition, ApprovalVersion, EmailAddress, PasswordDigest,
    Role, User, UserCredentials, UserId, UserProfile, Username,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by account repository adapters.
    pub enum AccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "account repository query failed: {message}",
        /// A unique username or email constraint rejected the write.
        Duplicate { constraint: String } =>
            "account already exists: {constraint}",
        /// The account is still referenced by rows it does not own.
        StillReferenced { message: String } =>
            "account is still referenced: {message}",
    }
}

/// Account to create, together with its initial approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub user: User,
    pub password: PasswordDigest,
    pub registered_at: DateTime<Utc>,
}

/// Overwrite of a rejected account by a fresh registration on the same email.
///
/// Applied only while the approval is still `rejected` at
/// `expected_version`; the approval becomes `re-registered` at the next
/// version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reregistration {
    pub user_id: UserId,
    pub expected_version: ApprovalVersion,
    pub username: Username,
    pub password: PasswordDigest,
    pub profile: UserProfile,
    pub registered_at: DateTime<Utc>,
}

/// Port for account storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fetch an account and its credential by exact username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserCredentials>, AccountRepositoryError>;

    /// Fetch an account by (normalised) email.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, AccountRepositoryError>;

    /// Fetch an account by id.
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, AccountRepositoryError>;

    /// Insert the user and a `pending` approval at version 1 atomically.
    async fn create_account(
        &self,
        account: &NewAccount,
    ) -> Result<Approval, AccountRepositoryError>;

    /// Apply a re-registration. Returns `None` when the approval was no
    /// longer `rejected` at the expected version.
    async fn reregister(
        &self,
        request: &Reregistration,
    ) -> Result<Option<Approval>, AccountRepositoryError>;

    /// Fetch the approval record for an account.
    async fn find_approval(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Approval>, AccountRepositoryError>;

    /// Apply a conditional approval write. Returns the updated record, or
    /// `None` when no row matched the expected version.
    async fn transition_approval(
        &self,
        transition: &ApprovalTransition,
    ) -> Result<Option<Approval>, AccountRepositoryError>;

    /// List every approval joined with its account, newest registration first.
    async fn list_approvals(&self) -> Result<Vec<ApprovalListing>, AccountRepositoryError>;

    /// Set the role of an account. Returns `false` when no account matched.
    async fn set_role(&self, user_id: &UserId, role: Role) -> Result<bool, AccountRepositoryError>;

    /// Delete an account with its approval and login record. Returns `false`
    /// when no account matched.
    async fn delete_account(&self, user_id: &UserId) -> Result<bool, AccountRepositoryError>;
}
