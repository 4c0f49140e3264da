//! Uniform `{code, message, data}` response envelope.
//!
//! Successful responses carry `code = 200` and `message = "success"`. Error
//! responses are built by the `ResponseError` impl in [`super::error`].

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::ErrorCode;

/// Message carried by every successful envelope.
pub const SUCCESS_MESSAGE: &str = "success";

/// Response wrapper shared by every API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: SUCCESS_MESSAGE.to_owned(),
            data,
        }
    }
}

/// Wrap `data` in a success envelope.
///
/// # Examples
/// ```
/// use portal::inbound::http::envelope::ok;
///
/// let response = ok(serde_json::json!({ "userId": "abc" }));
/// assert_eq!(response.status(), actix_web::http::StatusCode::OK);
/// ```
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope::success(data))
}

/// Error detail carried in `data` of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    #[schema(example = "invalid_request")]
    pub error: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Error envelope as documented in the OpenAPI schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    #[schema(example = 400)]
    pub code: u16,
    #[schema(example = "username must not be empty")]
    pub message: String,
    pub data: ErrorData,
}
