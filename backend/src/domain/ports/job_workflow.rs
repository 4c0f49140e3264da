//! Driving ports for job submission and artifact access.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    CsvFile, CsvFileMetadata, CsvUpload, Error, Job, JobDeletion, JobId, JobMetadata, ProblemId,
    UserId,
};

/// Validated request to create a job with its CSV artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobRequest {
    pub owner: UserId,
    pub problem_id: ProblemId,
    pub metadata: JobMetadata,
    pub upload: CsvUpload,
}

/// A job together with the artifact created for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJob {
    pub job: Job,
    pub csv: CsvFileMetadata,
}

/// Commands that create or remove jobs.
#[async_trait]
pub trait JobCommand: Send + Sync {
    /// Create a job and its artifact atomically.
    async fn create_job_with_csv(&self, request: CreateJobRequest) -> Result<CreatedJob, Error>;

    /// Create a child job that reuses its parent's artifact.
    async fn derive_job(
        &self,
        parent_id: JobId,
        caller: UserId,
        metadata: JobMetadata,
    ) -> Result<Job, Error>;

    /// Delete a job owned by `caller`, cascading to results and, when
    /// unshared, the artifact.
    async fn delete_job(&self, job_id: JobId, caller: UserId) -> Result<JobDeletion, Error>;
}

/// Read-side job queries.
#[async_trait]
pub trait JobQuery: Send + Sync {
    /// Fetch a job.
    async fn get_job(&self, job_id: JobId) -> Result<Job, Error>;

    /// Jobs owned by a user.
    async fn list_jobs_by_owner(&self, owner: UserId) -> Result<Vec<Job>, Error>;

    /// The artifact of a job owned by `caller`.
    async fn csv_for_job(&self, job_id: JobId, caller: UserId) -> Result<CsvFile, Error>;
}
