//! Administrative account endpoints.
//!
//! ```text
//! POST /api/v1/users/{user_id}/promote
//! DELETE /api/v1/users/{user_id}
//! ```

use actix_web::{HttpResponse, delete, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::Role;
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::{ErrorEnvelope, ok};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_user_id;

/// Role held by an account after promotion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
    pub role: Role,
}

/// Grant the administrator role. Takes effect at the account's next login.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/promote",
    params(("user_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account promoted", body = RoleResponse),
        (status = 400, description = "Malformed id", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "promoteToAdmin"
)]
#[post("/users/{user_id}/promote")]
pub async fn promote(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let admin = session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    state.accounts.promote_to_admin(user_id).await?;
    info!(%user_id, promoted_by = %admin.user_id, "role granted");
    Ok(ok(RoleResponse {
        user_id: user_id.to_string(),
        role: Role::Admin,
    }))
}

/// Delete an account with its approval and login record.
///
/// Accounts that still own jobs are refused with `409 Conflict`.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Malformed id", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Administrator role required", body = ErrorEnvelope),
        (status = 404, description = "No such account", body = ErrorEnvelope),
        (status = 409, description = "Account still owns jobs", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "deleteAccount"
)]
#[delete("/users/{user_id}")]
pub async fn delete_account(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    state.accounts.delete_account(user_id).await?;
    Ok(ok(serde_json::Value::Null))
}

/// Register the account administration handlers on a scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(promote).service(delete_account);
}

#[cfg(test)]
mod tests;
