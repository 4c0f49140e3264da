//! Job submission and artifact endpoints.
//!
//! ```text
//! POST /api/v1/jobs?problemId=...&fileName=train.csv&name=baseline   (body: CSV)
//! GET /api/v1/jobs
//! GET /api/v1/jobs/{job_id}
//! DELETE /api/v1/jobs/{job_id}
//! POST /api/v1/jobs/{job_id}/derive {"name":"retry"}
//! GET /api/v1/jobs/{job_id}/csv
//! ```
//!
//! Uploads are the raw request body; the client file name and job labels
//! travel in the query string.

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, delete, get, post, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{CreateJobRequest, CreatedJob};
use crate::domain::{
    CsvUpload, CsvValidationError, Error, Job, JobDeletion, JobMetadata, MAX_CSV_BYTES,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::{ErrorEnvelope, ok};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    map_csv_validation_error, map_job_metadata_error, parse_job_id, parse_problem_id,
};

/// Query parameters of a job upload.
#[derive(Debug, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CreateJobQuery {
    /// Problem the job belongs to.
    pub problem_id: String,
    /// Client file name; must end in `.csv`.
    pub file_name: String,
    pub name: Option<String>,
    /// Defaults to `preprocessing`.
    pub phase: Option<String>,
}

async fn read_upload(mut payload: web::Payload) -> ApiResult<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|err| Error::invalid_request(format!("upload interrupted: {err}")))?;
        if body.len() + chunk.len() > MAX_CSV_BYTES {
            return Err(map_csv_validation_error(CsvValidationError::TooLarge {
                max: MAX_CSV_BYTES,
            }));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Create a job and its CSV artifact in one step.
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    params(CreateJobQuery),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Job created", body = CreatedJob),
        (status = 400, description = "Invalid upload or unknown problem", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "createJob"
)]
#[post("/jobs")]
pub async fn create_job(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CreateJobQuery>,
    payload: web::Payload,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let CreateJobQuery {
        problem_id,
        file_name,
        name,
        phase,
    } = query.into_inner();
    let problem_id = parse_problem_id(&problem_id)?;
    let metadata = JobMetadata::try_from_parts(name.as_deref(), phase.as_deref())
        .map_err(map_job_metadata_error)?;
    let bytes = read_upload(payload).await?;
    let upload = CsvUpload::parse(&file_name, bytes).map_err(map_csv_validation_error)?;
    let created = state
        .jobs
        .create_job_with_csv(CreateJobRequest {
            owner: principal.user_id,
            problem_id,
            metadata,
            upload,
        })
        .await?;
    Ok(ok(created))
}

/// Jobs owned by the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    responses(
        (status = 200, description = "Caller's jobs", body = [Job]),
        (status = 401, description = "Login required", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "listJobs"
)]
#[get("/jobs")]
pub async fn list_jobs(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let jobs = state.job_queries.list_jobs_by_owner(principal.user_id).await?;
    Ok(ok(jobs))
}

/// Fetch one of the caller's jobs.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Job belongs to another user", body = ErrorEnvelope),
        (status = 404, description = "No such job", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "getJob"
)]
#[get("/jobs/{job_id}")]
pub async fn get_job(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let job_id = parse_job_id(&path)?;
    let job = state.job_queries.get_job(job_id).await?;
    job.ensure_owned_by(principal.user_id)?;
    Ok(ok(job))
}

/// Delete a job, its results and, once unshared, its artifact.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Deletion summary", body = JobDeletion),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Job belongs to another user", body = ErrorEnvelope),
        (status = 404, description = "No such job", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "deleteJob"
)]
#[delete("/jobs/{job_id}")]
pub async fn delete_job(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let job_id = parse_job_id(&path)?;
    let deletion = state.jobs.delete_job(job_id, principal.user_id).await?;
    Ok(ok(deletion))
}

/// Labels for a derived job.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeriveJobRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

/// Create a child job that reuses the parent's artifact.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job_id}/derive",
    params(("job_id" = String, Path, description = "Parent job id")),
    request_body = DeriveJobRequest,
    responses(
        (status = 200, description = "Child job", body = Job),
        (status = 400, description = "Invalid labels", body = ErrorEnvelope),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Job belongs to another user", body = ErrorEnvelope),
        (status = 404, description = "No such job", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "deriveJob"
)]
#[post("/jobs/{job_id}/derive")]
pub async fn derive_job(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<DeriveJobRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let parent_id = parse_job_id(&path)?;
    let DeriveJobRequest { name, phase } = payload.into_inner();
    let metadata = JobMetadata::try_from_parts(name.as_deref(), phase.as_deref())
        .map_err(map_job_metadata_error)?;
    let job = state
        .jobs
        .derive_job(parent_id, principal.user_id, metadata)
        .await?;
    Ok(ok(job))
}

/// Download the CSV artifact of one of the caller's jobs.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}/csv",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "CSV artifact", content_type = "text/csv", body = String),
        (status = 401, description = "Login required", body = ErrorEnvelope),
        (status = 403, description = "Job belongs to another user", body = ErrorEnvelope),
        (status = 404, description = "No such job", body = ErrorEnvelope)
    ),
    tags = ["jobs"],
    operation_id = "downloadJobCsv"
)]
#[get("/jobs/{job_id}/csv")]
pub async fn download_csv(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_user()?;
    let job_id = parse_job_id(&path)?;
    let file = state.job_queries.csv_for_job(job_id, principal.user_id).await?;
    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file.metadata.filename.clone())],
    };
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/csv; charset=utf-8"))
        .insert_header(disposition)
        .insert_header(("x-checksum-sha256", file.metadata.checksum.clone()))
        .body(file.content))
}

/// Register the job handlers on a scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_job)
        .service(list_jobs)
        .service(get_job)
        .service(delete_job)
        .service(derive_job)
        .service(download_csv);
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
