//! Registration and approval workflow.
//!
//! Every approval decision is a conditional write on the stored version, so
//! two administrators acting on the same stale version cannot both succeed.
//! Notifications go out only after the write has been accepted.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::notification::NotificationDispatcher;
use crate::domain::password::hash_password;
use crate::domain::ports::{
    AccountCommand, AccountQuery, AccountRepository, AccountRepositoryError, NewAccount,
    PasswordHasher, RegistrationKind, RegistrationOutcome, RejectionRequest, Reregistration,
};
use crate::domain::{
    AccountStatus, Approval, ApprovalListing, ApprovalStatus, ApprovalTransition,
    ApprovalVersion, Error, Registration, Role, User, UserId,
};

/// Service implementing [`AccountCommand`] and [`AccountQuery`].
#[derive(Clone)]
pub struct ApprovalWorkflowService<R> {
    accounts: Arc<R>,
    hasher: Arc<dyn PasswordHasher>,
    notifications: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl<R> ApprovalWorkflowService<R> {
    /// Create a service over the given account store.
    pub fn new(
        accounts: Arc<R>,
        hasher: Arc<dyn PasswordHasher>,
        notifications: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            notifications,
            clock,
        }
    }
}

impl<R> ApprovalWorkflowService<R>
where
    R: AccountRepository,
{
    fn map_repository_error(error: AccountRepositoryError) -> Error {
        match error {
            AccountRepositoryError::Connection { message } => {
                warn!(error = %message, "account repository unavailable");
                Error::service_unavailable("account store unavailable")
            }
            AccountRepositoryError::Query { message } => {
                Error::internal(format!("account repository error: {message}"))
            }
            AccountRepositoryError::Duplicate { constraint } => {
                info!(%constraint, "registration lost a uniqueness race");
                Error::registration_conflict("username or email already registered")
            }
            AccountRepositoryError::StillReferenced { message } => {
                info!(reference = %message, "account deletion refused");
                Error::conflict("account still owns jobs")
            }
        }
    }

    fn version_conflict(expected: ApprovalVersion, actual: ApprovalVersion) -> Error {
        Error::conflict("approval version mismatch").with_details(json!({
            "expectedVersion": expected.get(),
            "actualVersion": actual.get(),
            "code": "version_mismatch",
        }))
    }

    /// Explain why a conditional write matched no row.
    async fn stale_write(&self, user_id: UserId, expected: ApprovalVersion) -> Error {
        match self.accounts.find_approval(&user_id).await {
            Ok(Some(current)) => Self::version_conflict(expected, current.version),
            Ok(None) => Error::not_found(format!("approval for user {user_id} not found")),
            Err(err) => Self::map_repository_error(err),
        }
    }

    async fn apply_transition(&self, transition: ApprovalTransition) -> Result<Approval, Error> {
        let updated = self
            .accounts
            .transition_approval(&transition)
            .await
            .map_err(Self::map_repository_error)?;
        match updated {
            Some(approval) => Ok(approval),
            None => Err(self
                .stale_write(transition.user_id, transition.expected_version)
                .await),
        }
    }

    async fn reregister(
        &self,
        existing: User,
        registration: Registration,
    ) -> Result<RegistrationOutcome, Error> {
        let approval = self
            .accounts
            .find_approval(&existing.id())
            .await
            .map_err(Self::map_repository_error)?;
        let Some(approval) = approval.filter(|a| a.status == ApprovalStatus::Rejected) else {
            return Err(Error::registration_conflict("email already registered"));
        };

        let password = hash_password(Arc::clone(&self.hasher), registration.password()).await?;
        let request = Reregistration {
            user_id: existing.id(),
            expected_version: approval.version,
            username: registration.username().clone(),
            password,
            profile: registration.profile().clone(),
            registered_at: self.clock.utc(),
        };
        let Some(approval) = self
            .accounts
            .reregister(&request)
            .await
            .map_err(Self::map_repository_error)?
        else {
            return Err(Error::registration_conflict(
                "registration changed concurrently; retry",
            ));
        };

        info!(user_id = %existing.id(), version = %approval.version, "account re-registered");
        self.notifications
            .registration_received(registration.username(), registration.email());
        Ok(RegistrationOutcome {
            user_id: existing.id(),
            kind: RegistrationKind::ReRegistered,
            approval,
        })
    }
}

#[async_trait]
impl<R> AccountCommand for ApprovalWorkflowService<R>
where
    R: AccountRepository,
{
    async fn register(&self, registration: Registration) -> Result<RegistrationOutcome, Error> {
        let taken = self
            .accounts
            .find_by_username(registration.username())
            .await
            .map_err(Self::map_repository_error)?;
        if taken.is_some() {
            return Err(Error::registration_conflict("username already taken"));
        }

        if let Some(existing) = self
            .accounts
            .find_by_email(registration.email())
            .await
            .map_err(Self::map_repository_error)?
        {
            return self.reregister(existing, registration).await;
        }

        let password = hash_password(Arc::clone(&self.hasher), registration.password()).await?;
        let user = User::new(
            UserId::random(),
            registration.username().clone(),
            registration.email().clone(),
            Role::User,
            AccountStatus::Active,
            registration.profile().clone(),
        );
        let user_id = user.id();
        let account = NewAccount {
            user,
            password,
            registered_at: self.clock.utc(),
        };
        let approval = self
            .accounts
            .create_account(&account)
            .await
            .map_err(Self::map_repository_error)?;

        info!(%user_id, username = %registration.username(), "account registered");
        self.notifications
            .registration_received(registration.username(), registration.email());
        Ok(RegistrationOutcome {
            user_id,
            kind: RegistrationKind::Created,
            approval,
        })
    }

    async fn approve(
        &self,
        user_id: UserId,
        reviewer: &str,
        expected_version: ApprovalVersion,
    ) -> Result<Approval, Error> {
        let reviewer = reviewer.trim();
        if reviewer.is_empty() {
            return Err(Error::invalid_request("reviewer must not be empty"));
        }
        let transition =
            ApprovalTransition::approve(user_id, expected_version, reviewer, self.clock.utc());
        let approval = self.apply_transition(transition).await?;
        info!(%user_id, %reviewer, version = %approval.version, "account approved");
        Ok(approval)
    }

    async fn reject(&self, request: RejectionRequest) -> Result<Approval, Error> {
        let RejectionRequest {
            user_id,
            expected_version,
            reviewer,
            comment,
            is_cancel,
        } = request;
        let reviewer = reviewer.trim();
        if reviewer.is_empty() {
            return Err(Error::invalid_request("reviewer must not be empty"));
        }
        let transition = ApprovalTransition::reject(
            user_id,
            expected_version,
            reviewer,
            comment,
            self.clock.utc(),
        );
        let approval = self.apply_transition(transition).await?;
        info!(
            %user_id,
            %reviewer,
            is_cancel,
            version = %approval.version,
            "account rejected"
        );

        if !is_cancel {
            match self.accounts.find_by_id(&user_id).await {
                Ok(Some(user)) => {
                    self.notifications.registration_rejected(
                        user.username(),
                        user.email(),
                        approval.rejection_reason.as_deref(),
                    );
                }
                Ok(None) => warn!(%user_id, "rejected account vanished before notification"),
                Err(err) => warn!(%user_id, error = %err, "rejection notice lookup failed"),
            }
        }
        Ok(approval)
    }

    async fn promote_to_admin(&self, user_id: UserId) -> Result<(), Error> {
        let updated = self
            .accounts
            .set_role(&user_id, Role::Admin)
            .await
            .map_err(Self::map_repository_error)?;
        if !updated {
            return Err(Error::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, "account promoted to admin");
        Ok(())
    }

    async fn delete_account(&self, user_id: UserId) -> Result<(), Error> {
        let deleted = self
            .accounts
            .delete_account(&user_id)
            .await
            .map_err(Self::map_repository_error)?;
        if !deleted {
            return Err(Error::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, "account deleted");
        Ok(())
    }
}

#[async_trait]
impl<R> AccountQuery for ApprovalWorkflowService<R>
where
    R: AccountRepository,
{
    async fn approval_status(&self, user_id: UserId) -> Result<ApprovalStatus, Error> {
        self.approval(user_id).await.map(|approval| approval.status)
    }

    async fn approval(&self, user_id: UserId) -> Result<Approval, Error> {
        self.accounts
            .find_approval(&user_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("approval for user {user_id} not found")))
    }

    async fn list_approvals(&self) -> Result<Vec<ApprovalListing>, Error> {
        self.accounts
            .list_approvals()
            .await
            .map_err(Self::map_repository_error)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
