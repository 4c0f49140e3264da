//! Registration and session endpoints.
//!
//! ```text
//! POST /api/v1/auth/register {"username":"alice","email":"alice@x.com",...}
//! POST /api/v1/auth/login {"username":"alice","password":"wonderland"}
//! POST /api/v1/auth/logout
//! GET /api/v1/auth/me
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::RegistrationKind;
use crate::domain::{
    ApprovalStatus, AuthenticatedUser, EmailAddress, LoginCredentials, Principal, Registration,
    Role, UserProfile, Username, parse_peer_ip,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::{ErrorEnvelope, ok};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    map_login_validation_error, map_registration_validation_error, map_user_validation_error,
};

/// Registration request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@x.com")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub research: Option<String>,
}

impl RegisterRequest {
    fn into_registration(self) -> ApiResult<Registration> {
        let username = Username::new(&self.username).map_err(map_user_validation_error)?;
        let email = EmailAddress::new(&self.email).map_err(map_user_validation_error)?;
        let profile = UserProfile::try_from_parts(
            &self.first_name,
            &self.last_name,
            self.country.as_deref(),
            self.affiliation.as_deref(),
            self.research.as_deref(),
        )
        .map_err(map_user_validation_error)?;
        Registration::new(username, email, &self.password, profile)
            .map_err(map_registration_validation_error)
    }
}

/// Outcome of a registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
    pub status: ApprovalStatus,
    pub version: i32,
    /// True when a rejected registration on the same email was replaced.
    pub re_registered: bool,
}

/// Register an account; it stays `pending` until an administrator approves.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration accepted", body = RegisterResponse),
        (status = 400, description = "Invalid input or username/email taken", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = payload.into_inner().into_registration()?;
    let outcome = state.accounts.register(registration).await?;
    Ok(ok(RegisterResponse {
        user_id: outcome.user_id.to_string(),
        status: outcome.approval.status,
        version: outcome.approval.version.get(),
        re_registered: outcome.kind == RegistrationKind::ReRegistered,
    }))
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = crate::domain::LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Identity of the logged-in account.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<AuthenticatedUser> for LoginResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.id.to_string(),
            username: user.username.into(),
            email: user.email.into(),
            role: user.role,
        }
    }
}

/// Authenticate an approved account and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (
            status = 401,
            description = "Invalid credentials or account not approved",
            body = ErrorEnvelope
        ),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let user = state.login.authenticate(&credentials).await?;
    let peer_ip = req.peer_addr().map(|addr| addr.ip()).or_else(|| {
        req.connection_info()
            .realip_remote_addr()
            .and_then(parse_peer_ip)
    });
    state.login.record_login(user.id, peer_ip).await?;
    session.persist_principal(&Principal {
        user_id: user.id,
        role: user.role,
    })?;
    info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(ok(LoginResponse::from(user)))
}

/// Drop the caller's session. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    ok(serde_json::Value::Null)
}

/// Session identity.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
    pub role: Role,
}

/// Report the identity carried by the current session.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current session", body = MeResponse),
        (status = 401, description = "Login required", body = ErrorEnvelope)
    ),
    tags = ["auth"],
    operation_id = "currentUser"
)]
#[get("/auth/me")]
pub async fn me(session: SessionContext) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    Ok(ok(MeResponse {
        user_id: principal.user_id.to_string(),
        role: principal.role,
    }))
}

/// Register the auth handlers on a scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(me);
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
