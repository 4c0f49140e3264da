//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while rendering every
//! failure as the `{code, message, data}` envelope with a consistent status.

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use tracing::{error, warn};

use super::envelope::{ErrorData, ErrorEnvelope};
use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER, TraceId};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const REDACTED_MESSAGE: &str = "Internal server error";

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest | ErrorCode::RegistrationConflict => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized | ErrorCode::NotApproved => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal(REDACTED_MESSAGE);
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

fn envelope_for(error: &Error, status: StatusCode) -> ErrorEnvelope {
    let visible = redact_if_internal(error);
    let details = if matches!(visible.code(), ErrorCode::InternalError) {
        None
    } else {
        visible.details().cloned()
    };
    ErrorEnvelope {
        code: status.as_u16(),
        message: visible.message().to_owned(),
        data: ErrorData {
            error: visible.code(),
            details,
            trace_id: visible.trace_id().map(str::to_owned),
        },
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = ?self.code(), message = %self.message(), "request failed");
        }
        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }

        builder.json(envelope_for(self, status))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal(REDACTED_MESSAGE)
    }
}

fn extractor_error(kind: &'static str, detail: String) -> actix_web::Error {
    warn!(kind, %detail, "request rejected by extractor");
    let error = Error::invalid_request(format!("invalid {kind}: {detail}"));
    let error = match (error.trace_id(), TraceId::current()) {
        (None, Some(id)) => error.with_trace_id(id.to_string()),
        _ => error,
    };
    error.into()
}

/// JSON body extractor settings that render failures as error envelopes.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            extractor_error("json body", err.to_string())
        })
}

/// Query string extractor settings that render failures as error envelopes.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
            extractor_error("query", err.to_string())
        })
}

/// Path extractor settings that render failures as error envelopes.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err: PathError, _req: &HttpRequest| {
            extractor_error("path", err.to_string())
        })
}
