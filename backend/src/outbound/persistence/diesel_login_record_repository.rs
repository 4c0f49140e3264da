//! PostgreSQL-backed `LoginRecordRepository` using an upsert on `user_id`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{LoginRecordRepository, LoginRecordRepositoryError};
use crate::domain::{LoginRecord, UserId, parse_peer_ip};

use super::diesel_basic_error_mapping::{DieselFailure, classify_diesel_error, pool_failure};
use super::models::LoginSessionRow;
use super::pool::{DbPool, PoolError};
use super::schema::login_sessions;

/// Diesel-backed implementation of the [`LoginRecordRepository`] port.
#[derive(Clone)]
pub struct DieselLoginRecordRepository {
    pool: DbPool,
}

impl DieselLoginRecordRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DieselFailure) -> LoginRecordRepositoryError {
    match failure {
        DieselFailure::Connection(message) => LoginRecordRepositoryError::connection(message),
        DieselFailure::UniqueViolation { constraint }
        | DieselFailure::ForeignKeyViolation { constraint } => {
            LoginRecordRepositoryError::query(format!("constraint violated: {constraint}"))
        }
        DieselFailure::Query(message) => LoginRecordRepositoryError::query(message),
    }
}

fn map_pool_error(error: PoolError) -> LoginRecordRepositoryError {
    map_failure(pool_failure(error))
}

fn map_diesel_error(error: diesel::result::Error) -> LoginRecordRepositoryError {
    map_failure(classify_diesel_error(error))
}

fn record_to_row(record: &LoginRecord) -> LoginSessionRow {
    LoginSessionRow {
        user_id: *record.user_id.as_uuid(),
        login_at: record.login_at,
        login_ip: record.login_ip.map(|ip| ip.to_string()),
        expires_at: record.expires_at,
    }
}

fn row_to_record(row: LoginSessionRow) -> LoginRecord {
    LoginRecord {
        user_id: UserId::from_uuid(row.user_id),
        login_at: row.login_at,
        login_ip: row.login_ip.as_deref().and_then(parse_peer_ip),
        expires_at: row.expires_at,
    }
}

#[async_trait]
impl LoginRecordRepository for DieselLoginRecordRepository {
    async fn upsert(
        &self,
        record: &LoginRecord,
    ) -> Result<LoginRecord, LoginRecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = record_to_row(record);
        let stored: LoginSessionRow = diesel::insert_into(login_sessions::table)
            .values(&row)
            .on_conflict(login_sessions::user_id)
            .do_update()
            .set((
                login_sessions::login_at.eq(excluded(login_sessions::login_at)),
                login_sessions::login_ip.eq(excluded(login_sessions::login_ip)),
                login_sessions::expires_at.eq(excluded(login_sessions::expires_at)),
            ))
            .returning(LoginSessionRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_record(stored))
    }

    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<LoginRecord>, LoginRecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LoginSessionRow> = login_sessions::table
            .find(user_id.as_uuid())
            .select(LoginSessionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_record))
    }
}
