//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;

use crate::domain::{
    CsvValidationError, Error, JobId, JobMetadataError, LoginValidationError, ProblemId,
    RegistrationValidationError, UserId, UserValidationError,
};

/// Validation error codes reported in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldErrorCode {
    InvalidUuid,
    Empty,
    TooLong,
    Malformed,
}

impl FieldErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUuid => "invalid_uuid",
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::Malformed => "malformed",
        }
    }
}

pub(crate) fn field_error(field: &str, code: FieldErrorCode, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code.as_str(),
    }))
}

fn invalid_uuid(field: &str, value: &str) -> Error {
    Error::invalid_request(format!("{field} must be a valid UUID")).with_details(json!({
        "field": field,
        "value": value,
        "code": FieldErrorCode::InvalidUuid.as_str(),
    }))
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|_| invalid_uuid("userId", raw))
}

pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, Error> {
    raw.parse().map_err(|_| invalid_uuid("jobId", raw))
}

pub(crate) fn parse_problem_id(raw: &str) -> Result<ProblemId, Error> {
    raw.trim().parse().map_err(|_| invalid_uuid("problemId", raw))
}

pub(crate) fn map_user_validation_error(err: UserValidationError) -> Error {
    let message = err.to_string();
    let (field, code) = match err {
        UserValidationError::InvalidId => ("userId", FieldErrorCode::InvalidUuid),
        UserValidationError::EmptyUsername => ("username", FieldErrorCode::Empty),
        UserValidationError::UsernameTooLong { .. } => ("username", FieldErrorCode::TooLong),
        UserValidationError::UsernameInvalidCharacters => ("username", FieldErrorCode::Malformed),
        UserValidationError::EmptyEmail => ("email", FieldErrorCode::Empty),
        UserValidationError::MalformedEmail => ("email", FieldErrorCode::Malformed),
        UserValidationError::EmailTooLong { .. } => ("email", FieldErrorCode::TooLong),
        UserValidationError::EmptyProfileField { field } => (field, FieldErrorCode::Empty),
        UserValidationError::ProfileFieldTooLong { field, .. } => (field, FieldErrorCode::TooLong),
        UserValidationError::UnknownRole(_) => ("role", FieldErrorCode::Malformed),
        UserValidationError::UnknownStatus(_) => ("status", FieldErrorCode::Malformed),
    };
    field_error(field, code, message)
}

pub(crate) fn map_registration_validation_error(err: RegistrationValidationError) -> Error {
    match err {
        RegistrationValidationError::Field(inner) => map_user_validation_error(inner),
        RegistrationValidationError::EmptyPassword => {
            field_error("password", FieldErrorCode::Empty, "password must not be empty")
        }
    }
}

pub(crate) fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => {
            field_error("username", FieldErrorCode::Empty, "username must not be empty")
        }
        LoginValidationError::EmptyPassword => {
            field_error("password", FieldErrorCode::Empty, "password must not be empty")
        }
    }
}

pub(crate) fn map_job_metadata_error(err: JobMetadataError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "code": "invalid_job_metadata" }))
}

pub(crate) fn map_csv_validation_error(err: CsvValidationError) -> Error {
    let code = match &err {
        CsvValidationError::NotCsvFileName => "not_csv_file_name",
        CsvValidationError::Empty => "empty_csv",
        CsvValidationError::TooLarge { .. } => "csv_too_large",
        CsvValidationError::NotUtf8 => "csv_not_utf8",
        CsvValidationError::ContainsNul => "csv_contains_nul",
        CsvValidationError::Malformed { .. } => "csv_malformed",
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": "file", "code": code }))
}
