//! Credential checks and last-login bookkeeping.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::password::verify_password;
use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, LoginRecordRepository, LoginRecordRepositoryError,
    LoginService, PasswordHasher,
};
use crate::domain::{
    AccountStatus, ApprovalStatus, AuthenticatedUser, Error, LoginCredentials, LoginRecord,
    UserId, Username,
};

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// [`LoginService`] backed by the account and login record stores.
#[derive(Clone)]
pub struct AccountLoginService<R, L> {
    accounts: Arc<R>,
    login_records: Arc<L>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    session_ttl: Option<TimeDelta>,
}

impl<R, L> AccountLoginService<R, L> {
    pub fn new(
        accounts: Arc<R>,
        login_records: Arc<L>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            login_records,
            hasher,
            clock,
            session_ttl: None,
        }
    }

    /// Stamp login records with an expiry `ttl` after the login time.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: TimeDelta) -> Self {
        self.session_ttl = Some(ttl);
        self
    }
}

impl<R, L> AccountLoginService<R, L>
where
    R: AccountRepository,
    L: LoginRecordRepository,
{
    fn map_account_error(error: AccountRepositoryError) -> Error {
        match error {
            AccountRepositoryError::Connection { message } => {
                warn!(error = %message, "account repository unavailable");
                Error::service_unavailable("account store unavailable")
            }
            other => Error::internal(format!("account repository error: {other}")),
        }
    }

    fn map_login_record_error(error: LoginRecordRepositoryError) -> Error {
        match error {
            LoginRecordRepositoryError::Connection { message } => {
                warn!(error = %message, "login record repository unavailable");
                Error::service_unavailable("login record store unavailable")
            }
            LoginRecordRepositoryError::Query { message } => {
                Error::internal(format!("login record repository error: {message}"))
            }
        }
    }
}

#[async_trait]
impl<R, L> LoginService for AccountLoginService<R, L>
where
    R: AccountRepository,
    L: LoginRecordRepository,
{
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthenticatedUser, Error> {
        let Ok(username) = Username::new(credentials.username()) else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        let Some(stored) = self
            .accounts
            .find_by_username(&username)
            .await
            .map_err(Self::map_account_error)?
        else {
            debug!(%username, "login for unknown username");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let verified = verify_password(
            Arc::clone(&self.hasher),
            credentials.password(),
            stored.password,
        )
        .await?;
        if !verified {
            debug!(%username, "login with wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let user = stored.user;
        if user.status() == AccountStatus::Disabled {
            return Err(Error::forbidden("account is disabled"));
        }

        let approval = self
            .accounts
            .find_approval(&user.id())
            .await
            .map_err(Self::map_account_error)?;
        match approval.map(|a| a.status) {
            Some(ApprovalStatus::Approved) => Ok(AuthenticatedUser::from(&user)),
            status => Err(Error::not_approved("account is not approved").with_details(json!({
                "status": status.map(ApprovalStatus::as_str),
            }))),
        }
    }

    async fn record_login(
        &self,
        user_id: UserId,
        ip: Option<IpAddr>,
    ) -> Result<LoginRecord, Error> {
        let login_at = self.clock.utc();
        let record = LoginRecord {
            user_id,
            login_at,
            login_ip: ip,
            expires_at: self.session_ttl.map(|ttl| login_at + ttl),
        };
        let stored = self
            .login_records
            .upsert(&record)
            .await
            .map_err(Self::map_login_record_error)?;
        info!(%user_id, ip = ?stored.login_ip, "login recorded");
        Ok(stored)
    }
}
