//! Shared classification of pool and Diesel failures.
//!
//! Repositories translate a [`DieselFailure`] into their own port error so
//! storage details never leak past the adapter.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Storage failure reduced to the cases repositories care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped or could not be obtained.
    Connection(String),
    /// A unique constraint rejected the write.
    UniqueViolation { constraint: String },
    /// A foreign key constraint rejected the write.
    ForeignKeyViolation { constraint: String },
    /// Any other query failure.
    Query(String),
}

/// Extract the message of a pool error.
pub(crate) fn pool_failure(error: PoolError) -> DieselFailure {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DieselFailure::Connection(message)
        }
    }
}

/// Classify a Diesel error, logging the raw cause at debug level.
pub(crate) fn classify_diesel_error(error: DieselError) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DieselFailure::Connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation {
                constraint: info.constraint_name().unwrap_or("unique").to_owned(),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DieselFailure::ForeignKeyViolation {
                constraint: info.constraint_name().unwrap_or("foreign key").to_owned(),
            }
        }
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => {
            DieselFailure::Query("database query error".to_owned())
        }
        _ => DieselFailure::Query("database error".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[derive(Debug)]
    struct FixtureInfo {
        constraint: Option<&'static str>,
    }

    impl diesel::result::DatabaseErrorInformation for FixtureInfo {
        fn message(&self) -> &str {
            "fixture failure"
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(FixtureInfo { constraint }))
    }

    #[rstest]
    #[case(
        database_error(DatabaseErrorKind::UniqueViolation, Some("users_email_key")),
        DieselFailure::UniqueViolation { constraint: "users_email_key".to_owned() }
    )]
    #[case(
        database_error(DatabaseErrorKind::ForeignKeyViolation, Some("jobs_owner_id_fkey")),
        DieselFailure::ForeignKeyViolation { constraint: "jobs_owner_id_fkey".to_owned() }
    )]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection, None),
        DieselFailure::Connection("database connection error".to_owned())
    )]
    #[case(DieselError::NotFound, DieselFailure::Query("record not found".to_owned()))]
    fn classifies_database_errors(#[case] error: DieselError, #[case] expected: DieselFailure) {
        assert_eq!(classify_diesel_error(error), expected);
    }

    #[test]
    fn pool_errors_are_connection_failures() {
        assert_eq!(
            pool_failure(PoolError::checkout("timed out")),
            DieselFailure::Connection("timed out".to_owned())
        );
    }
}
