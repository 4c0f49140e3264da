//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health probes and the
//! request/response schemas. Success responses are documented by the type
//! carried in the envelope's `data` field; every error response uses
//! [`ErrorEnvelope`]. Swagger UI serves the document in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::CreatedJob;
use crate::domain::{
    AccountStatus, Approval, ApprovalListing, ApprovalStatus, CsvFileMetadata, ErrorCode, Job,
    JobDeletion, JobStatus, Role, UserProfile,
};
use crate::inbound::http::approvals::{ApprovalStatusResponse, ApproveRequest, RejectRequest};
use crate::inbound::http::auth::{
    LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse,
};
use crate::inbound::http::envelope::{ErrorData, ErrorEnvelope};
use crate::inbound::http::jobs::DeriveJobRequest;
use crate::inbound::http::users::RoleResponse;

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Research portal API",
        description = "Account approval workflow, job submission and CSV artifacts."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::me,
        crate::inbound::http::approvals::list_approvals,
        crate::inbound::http::approvals::get_approval,
        crate::inbound::http::approvals::approval_status,
        crate::inbound::http::approvals::approve,
        crate::inbound::http::approvals::reject,
        crate::inbound::http::users::promote,
        crate::inbound::http::users::delete_account,
        crate::inbound::http::jobs::create_job,
        crate::inbound::http::jobs::list_jobs,
        crate::inbound::http::jobs::get_job,
        crate::inbound::http::jobs::delete_job,
        crate::inbound::http::jobs::derive_job,
        crate::inbound::http::jobs::download_csv,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        LoginResponse,
        MeResponse,
        Approval,
        ApprovalListing,
        ApprovalStatus,
        ApprovalStatusResponse,
        ApproveRequest,
        RejectRequest,
        RoleResponse,
        Job,
        JobStatus,
        JobDeletion,
        CreatedJob,
        CsvFileMetadata,
        DeriveJobRequest,
        ErrorEnvelope,
        ErrorData,
        ErrorCode,
        Role,
        AccountStatus,
        UserProfile,
    )),
    tags(
        (name = "auth", description = "Registration, login and session identity"),
        (name = "approvals", description = "Administrator review of new accounts"),
        (name = "users", description = "Administrator account management"),
        (name = "jobs", description = "Jobs and their CSV artifacts"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
