//! Approval workflow endpoints.
//!
//! Decisions carry the version the administrator last read; a stale version
//! is answered with `409 Conflict` so the client can refresh and retry.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::RejectionRequest;
use crate::domain::{
    Approval, ApprovalListing, ApprovalStatus, ApprovalVersion, Error, RejectionReason,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::{ErrorEnvelope, ok};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldErrorCode, field_error, parse_user_id};

fn parse_version(raw: i32) -> ApiResult<ApprovalVersion> {
    ApprovalVersion::new(raw).map_err(|err| {
        field_error("expectedVersion", FieldErrorCode::Malformed, err.to_string())
    })
}

fn parse_rejection_reason(raw: Option<&str>) -> ApiResult<Option<RejectionReason>> {
    let Some(raw) = raw else { return Ok(None) };
    RejectionReason::parse(raw)
        .map_err(|err| field_error("comment", FieldErrorCode::TooLong, err.to_string()))
}

/// List every approval with its account details, newest registration first.
#[utoipa::path(
    get,
    path = "/api/v1/approvals",
    responses(
        (status = 200, description = "Approvals", body = [ApprovalListing]),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope)
    ),
    tags = ["approvals"],
    operation_id = "listApprovals"
)]
#[get("/approvals")]
pub async fn list_approvals(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let listings = state.approvals.list_approvals().await?;
    Ok(ok(listings))
}

/// Fetch the approval record of one account.
#[utoipa::path(
    get,
    path = "/api/v1/approvals/{user_id}",
    params(("user_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Approval record", body = Approval),
        (status = 400, description = "Malformed id", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope)
    ),
    tags = ["approvals"],
    operation_id = "getApproval"
)]
#[get("/approvals/{user_id}")]
pub async fn get_approval(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    let approval = state.approvals.approval(user_id).await?;
    Ok(ok(approval))
}

/// Approval status of one account.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStatusResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
    pub status: ApprovalStatus,
}

/// Approval status of an account; callers may read their own, admins any.
#[utoipa::path(
    get,
    path = "/api/v1/approvals/{user_id}/status",
    params(("user_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Approval status", body = ApprovalStatusResponse),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Not the caller's account", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope)
    ),
    tags = ["approvals"],
    operation_id = "getApprovalStatus"
)]
#[get("/approvals/{user_id}/status")]
pub async fn approval_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let user_id = parse_user_id(&path)?;
    if principal.user_id != user_id && !principal.is_admin() {
        return Err(Error::forbidden("cannot read another account's approval"));
    }
    let status = state.approvals.approval_status(user_id).await?;
    Ok(ok(ApprovalStatusResponse {
        user_id: user_id.to_string(),
        status,
    }))
}

/// Body of an approve decision.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    #[schema(example = 1)]
    pub expected_version: i32,
}

/// Approve a pending or re-registered account.
#[utoipa::path(
    post,
    path = "/api/v1/approvals/{user_id}/approve",
    params(("user_id" = String, Path, description = "Account id")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Updated approval", body = Approval),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope),
        (status = 409, description = "Approval changed since it was read", body = ErrorEnvelope)
    ),
    tags = ["approvals"],
    operation_id = "approve"
)]
#[post("/approvals/{user_id}/approve")]
pub async fn approve(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ApproveRequest>,
) -> ApiResult<HttpResponse> {
    let admin = session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    let expected = parse_version(payload.expected_version)?;
    let reviewer = admin.user_id.to_string();
    let approval = state.accounts.approve(user_id, &reviewer, expected).await?;
    Ok(ok(approval))
}

/// Body of a reject decision.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[schema(example = 1)]
    pub expected_version: i32,
    /// Shown to the applicant; at most 255 characters.
    #[serde(default)]
    #[schema(max_length = 255)]
    pub comment: Option<String>,
    /// Withdraw the request without emailing the applicant.
    #[serde(default)]
    pub is_cancel: bool,
}

/// Reject a pending or re-registered account.
#[utoipa::path(
    post,
    path = "/api/v1/approvals/{user_id}/reject",
    params(("user_id" = String, Path, description = "Account id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Updated approval", body = Approval),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope),
        (status = 409, description = "Approval changed since it was read", body = ErrorEnvelope)
    ),
    tags = ["approvals"],
    operation_id = "reject"
)]
#[post("/approvals/{user_id}/reject")]
pub async fn reject(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectRequest>,
) -> ApiResult<HttpResponse> {
    let admin = session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    let RejectRequest {
        expected_version,
        comment,
        is_cancel,
    } = payload.into_inner();
    let request = RejectionRequest {
        user_id,
        expected_version: parse_version(expected_version)?,
        reviewer: admin.user_id.to_string(),
        comment: parse_rejection_reason(comment.as_deref())?,
        is_cancel,
    };
    let approval = state.accounts.reject(request).await?;
    Ok(ok(approval))
}

/// Register the approval handlers on a scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_approvals)
        .service(approval_status)
        .service(get_approval)
        .service(approve)
        .service(reject);
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
