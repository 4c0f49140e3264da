//! Port for last-login metadata.

use async_trait::async_trait;

use crate::domain::{LoginRecord, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by login record adapters.
    pub enum LoginRecordRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "login record connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "login record query failed: {message}",
    }
}

/// Port for storing one login record per account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginRecordRepository: Send + Sync {
    /// Insert the record, or overwrite the existing one for the same user.
    async fn upsert(&self, record: &LoginRecord) -> Result<LoginRecord, LoginRecordRepositoryError>;

    /// Fetch the record for a user.
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<LoginRecord>, LoginRecordRepositoryError>;
}
