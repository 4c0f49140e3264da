//! PostgreSQL-backed `AccountRepository` implementation using Diesel ORM.
//!
//! Account and approval rows are written in one transaction. Approval
//! decisions are a single `UPDATE ... WHERE version = $expected RETURNING *`
//! so concurrent reviewers serialize on the row instead of racing a read.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, NewAccount, Reregistration,
};
use crate::domain::{
    AccountStatus, Approval, ApprovalListing, ApprovalStatus, ApprovalTransition,
    ApprovalVersion, EmailAddress, PasswordDigest, Role, User, UserCredentials, UserId,
    UserProfile, Username,
};

use super::diesel_basic_error_mapping::{DieselFailure, classify_diesel_error, pool_failure};
use super::models::{
    ApprovalRow, ApprovalUpdate, NewApprovalRow, NewUserRow, ReregistrationUpdate, UserRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{login_sessions, user_approvals, users};

/// Diesel-backed implementation of the [`AccountRepository`] port.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DieselFailure) -> AccountRepositoryError {
    match failure {
        DieselFailure::Connection(message) => AccountRepositoryError::connection(message),
        DieselFailure::UniqueViolation { constraint } => {
            AccountRepositoryError::duplicate(constraint)
        }
        DieselFailure::ForeignKeyViolation { constraint } => {
            AccountRepositoryError::still_referenced(constraint)
        }
        DieselFailure::Query(message) => AccountRepositoryError::query(message),
    }
}

fn map_pool_error(error: PoolError) -> AccountRepositoryError {
    map_failure(pool_failure(error))
}

fn map_diesel_error(error: diesel::result::Error) -> AccountRepositoryError {
    map_failure(classify_diesel_error(error))
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> AccountRepositoryError {
    AccountRepositoryError::query(format!("stored {what} is invalid: {err}"))
}

fn row_to_user(row: UserRow) -> Result<UserCredentials, AccountRepositoryError> {
    let profile = UserProfile::try_from_parts(
        &row.first_name,
        &row.last_name,
        row.country.as_deref(),
        row.affiliation.as_deref(),
        row.research.as_deref(),
    )
    .map_err(|err| corrupt("profile", err))?;
    let user = User::new(
        UserId::from_uuid(row.id),
        Username::new(&row.username).map_err(|err| corrupt("username", err))?,
        EmailAddress::new(&row.email).map_err(|err| corrupt("email", err))?,
        Role::from_str(&row.role).map_err(|err| corrupt("role", err))?,
        AccountStatus::from_str(&row.status).map_err(|err| corrupt("status", err))?,
        profile,
    );
    Ok(UserCredentials {
        user,
        password: PasswordDigest::new(row.password_hash),
    })
}

fn row_to_approval(row: ApprovalRow) -> Result<Approval, AccountRepositoryError> {
    Ok(Approval {
        user_id: UserId::from_uuid(row.user_id),
        username: Username::new(&row.username).map_err(|err| corrupt("username", err))?,
        status: ApprovalStatus::from_str(&row.status).map_err(|err| corrupt("approval", err))?,
        reviewer: row.reviewer,
        version: ApprovalVersion::new(row.version).map_err(|err| corrupt("version", err))?,
        rejection_reason: row.rejection_reason,
        registered_at: row.registered_at,
        processed_at: row.processed_at,
    })
}

fn rows_to_listing(
    approval: ApprovalRow,
    user: UserRow,
) -> Result<ApprovalListing, AccountRepositoryError> {
    let user = row_to_user(user)?.user;
    Ok(ApprovalListing {
        approval: row_to_approval(approval)?,
        email: user.email().clone(),
        role: user.role(),
        profile: user.profile().clone(),
    })
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserCredentials>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_user).transpose()?.map(|credentials| credentials.user))
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .find(user_id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_user).transpose()?.map(|credentials| credentials.user))
    }

    async fn create_account(
        &self,
        account: &NewAccount,
    ) -> Result<Approval, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user = &account.user;
        let profile = user.profile();
        let new_user = NewUserRow {
            id: *user.id().as_uuid(),
            username: user.username().as_ref(),
            email: user.email().as_ref(),
            password_hash: account.password.as_str(),
            role: user.role().as_str(),
            status: user.status().as_str(),
            first_name: profile.first_name(),
            last_name: profile.last_name(),
            country: profile.country(),
            affiliation: profile.affiliation(),
            research: profile.research(),
            created_at: account.registered_at,
            updated_at: account.registered_at,
        };
        let new_approval = NewApprovalRow {
            user_id: *user.id().as_uuid(),
            username: user.username().as_ref(),
            status: ApprovalStatus::Pending.as_str(),
            version: ApprovalVersion::initial().get(),
            registered_at: account.registered_at,
            processed_at: account.registered_at,
        };

        let row = conn
            .transaction(|conn| {
                async move {
                    diesel::insert_into(users::table)
                        .values(&new_user)
                        .execute(conn)
                        .await?;
                    diesel::insert_into(user_approvals::table)
                        .values(&new_approval)
                        .returning(ApprovalRow::as_returning())
                        .get_result::<ApprovalRow>(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        row_to_approval(row)
    }

    async fn reregister(
        &self,
        request: &Reregistration,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = *request.user_id.as_uuid();
        let expected = request.expected_version.get();
        let approval_update = ApprovalUpdate {
            status: ApprovalStatus::ReRegistered.as_str(),
            reviewer: None,
            version: request.expected_version.next().get(),
            rejection_reason: None,
            processed_at: request.registered_at,
        };
        let profile = &request.profile;
        let user_update = ReregistrationUpdate {
            username: request.username.as_ref(),
            password_hash: request.password.as_str(),
            role: Role::User.as_str(),
            status: AccountStatus::Active.as_str(),
            first_name: profile.first_name(),
            last_name: profile.last_name(),
            country: profile.country(),
            affiliation: profile.affiliation(),
            research: profile.research(),
            updated_at: request.registered_at,
        };
        let registered_at = request.registered_at;

        let row = conn
            .transaction(|conn| {
                async move {
                    let claimed = diesel::update(user_approvals::table)
                        .filter(user_approvals::user_id.eq(user_id))
                        .filter(user_approvals::version.eq(expected))
                        .filter(user_approvals::status.eq(ApprovalStatus::Rejected.as_str()))
                        .set((
                            &approval_update,
                            user_approvals::registered_at.eq(registered_at),
                        ))
                        .execute(conn)
                        .await?;
                    if claimed == 0 {
                        return Ok(None);
                    }

                    // The username change cascades into user_approvals.
                    diesel::update(users::table.find(user_id))
                        .set(&user_update)
                        .execute(conn)
                        .await?;

                    user_approvals::table
                        .find(user_id)
                        .select(ApprovalRow::as_select())
                        .first::<ApprovalRow>(conn)
                        .await
                        .map(Some)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        row.map(row_to_approval).transpose()
    }

    async fn find_approval(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ApprovalRow> = user_approvals::table
            .find(user_id.as_uuid())
            .select(ApprovalRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_approval).transpose()
    }

    async fn transition_approval(
        &self,
        transition: &ApprovalTransition,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let update = ApprovalUpdate {
            status: transition.status.as_str(),
            reviewer: transition.reviewer.as_deref(),
            version: transition.expected_version.next().get(),
            rejection_reason: transition.rejection_reason.as_deref(),
            processed_at: transition.processed_at,
        };
        let row: Option<ApprovalRow> = diesel::update(user_approvals::table)
            .filter(user_approvals::user_id.eq(transition.user_id.as_uuid()))
            .filter(user_approvals::version.eq(transition.expected_version.get()))
            .set(&update)
            .returning(ApprovalRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_approval).transpose()
    }

    async fn list_approvals(&self) -> Result<Vec<ApprovalListing>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(ApprovalRow, UserRow)> = user_approvals::table
            .inner_join(users::table)
            .select((ApprovalRow::as_select(), UserRow::as_select()))
            .order_by(user_approvals::registered_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(approval, user)| rows_to_listing(approval, user))
            .collect()
    }

    async fn set_role(&self, user_id: &UserId, role: Role) -> Result<bool, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user_id.as_uuid()))
            .set(users::role.eq(role.as_str()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete_account(&self, user_id: &UserId) -> Result<bool, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = *user_id.as_uuid();
        conn.transaction(|conn| {
            async move {
                diesel::delete(login_sessions::table.find(id))
                    .execute(conn)
                    .await?;
                diesel::delete(user_approvals::table.find(id))
                    .execute(conn)
                    .await?;
                let deleted = diesel::delete(users::table.find(id)).execute(conn).await?;
                Ok::<_, diesel::result::Error>(deleted > 0)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage; queries are exercised by the integration suite.
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn user_row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "alice".to_owned(),
            email: "alice@x.com".to_owned(),
            password_hash: "$argon2id$fixture".to_owned(),
            role: "admin".to_owned(),
            status: "active".to_owned(),
            first_name: "Alice".to_owned(),
            last_name: "Liddell".to_owned(),
            country: None,
            affiliation: Some("Oxford".to_owned()),
            research: None,
        }
    }

    #[rstest]
    fn converts_user_rows() {
        let credentials = row_to_user(user_row()).expect("valid row");
        assert_eq!(credentials.user.role(), Role::Admin);
        assert_eq!(credentials.user.profile().affiliation(), Some("Oxford"));
        assert_eq!(credentials.password.as_str(), "$argon2id$fixture");
    }

    #[rstest]
    #[case::role(|row: &mut UserRow| row.role = "root".to_owned())]
    #[case::status(|row: &mut UserRow| row.status = "banned".to_owned())]
    #[case::email(|row: &mut UserRow| row.email = "nobody".to_owned())]
    fn rejects_corrupt_user_rows(#[case] corrupt_row: fn(&mut UserRow)) {
        let mut row = user_row();
        corrupt_row(&mut row);
        let err = row_to_user(row).expect_err("corrupt row");
        assert!(matches!(err, AccountRepositoryError::Query { .. }));
    }

    #[rstest]
    fn converts_approval_rows() {
        let now = Utc::now();
        let approval = row_to_approval(ApprovalRow {
            user_id: Uuid::new_v4(),
            username: "alice".to_owned(),
            status: "re-registered".to_owned(),
            reviewer: None,
            version: 3,
            rejection_reason: None,
            registered_at: now,
            processed_at: now,
        })
        .expect("valid row");
        assert_eq!(approval.status, ApprovalStatus::ReRegistered);
        assert_eq!(approval.version.get(), 3);
    }

    #[rstest]
    fn maps_unique_violation_to_duplicate() {
        let err = map_failure(DieselFailure::UniqueViolation {
            constraint: "users_username_key".to_owned(),
        });
        assert_eq!(err, AccountRepositoryError::duplicate("users_username_key"));
    }
}
