//! Job submission, derivation and cascading cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    CreateJobRequest, CreatedJob, JobCommand, JobQuery, JobRepository, JobRepositoryError,
};
use crate::domain::{
    CsvFile, Error, Job, JobDeletion, JobId, JobMetadata, NewJob, ProblemId, UserId,
};

/// Service implementing [`JobCommand`] and [`JobQuery`].
#[derive(Clone)]
pub struct JobService<J> {
    jobs: Arc<J>,
    clock: Arc<dyn Clock>,
}

impl<J> JobService<J> {
    pub fn new(jobs: Arc<J>, clock: Arc<dyn Clock>) -> Self {
        Self { jobs, clock }
    }
}

impl<J> JobService<J>
where
    J: JobRepository,
{
    fn map_repository_error(error: JobRepositoryError) -> Error {
        match error {
            JobRepositoryError::Connection { message } => {
                warn!(error = %message, "job repository unavailable");
                Error::service_unavailable("job store unavailable")
            }
            JobRepositoryError::Query { message } => {
                Error::internal(format!("job repository error: {message}"))
            }
            JobRepositoryError::MissingReference { message } => {
                warn!(constraint = %message, "job insert referenced a missing row");
                Error::invalid_request("job references an unknown owner, problem or artifact")
            }
        }
    }

    async fn owned_job(&self, job_id: JobId, caller: UserId) -> Result<Job, Error> {
        let job = self.get_job(job_id).await?;
        job.ensure_owned_by(caller)?;
        Ok(job)
    }

    fn new_job(
        &self,
        owner: UserId,
        parent: Option<&Job>,
        problem_id: Option<ProblemId>,
        metadata: &JobMetadata,
    ) -> NewJob {
        NewJob {
            id: JobId::random(),
            owner,
            parent_job_id: parent.map(|p| p.id),
            problem_id,
            name: metadata.name().map(str::to_owned),
            phase: metadata.phase().to_owned(),
            created_at: self.clock.utc(),
        }
    }
}

#[async_trait]
impl<J> JobCommand for JobService<J>
where
    J: JobRepository,
{
    async fn create_job_with_csv(&self, request: CreateJobRequest) -> Result<CreatedJob, Error> {
        let CreateJobRequest {
            owner,
            problem_id,
            metadata,
            upload,
        } = request;

        let exists = self
            .jobs
            .problem_exists(&problem_id)
            .await
            .map_err(Self::map_repository_error)?;
        if !exists {
            return Err(Error::invalid_request(format!(
                "invalid problem id: {problem_id} not found"
            )));
        }

        let new_job = self.new_job(owner, None, Some(problem_id), &metadata);
        let rows = upload.row_count();
        let artifact = upload.into_artifact(new_job.created_at);
        let csv = artifact.metadata();
        let job = self
            .jobs
            .create_job_with_csv(&new_job, &artifact)
            .await
            .map_err(Self::map_repository_error)?;

        info!(
            job_id = %job.id,
            %owner,
            csv_file_id = %csv.id,
            size_bytes = csv.size_bytes,
            rows,
            "job created"
        );
        Ok(CreatedJob { job, csv })
    }

    async fn derive_job(
        &self,
        parent_id: JobId,
        caller: UserId,
        metadata: JobMetadata,
    ) -> Result<Job, Error> {
        let parent = self.owned_job(parent_id, caller).await?;
        let new_job = self.new_job(caller, Some(&parent), parent.problem_id, &metadata);
        let job = self
            .jobs
            .create_job_sharing_csv(&new_job, &parent.csv_file_id)
            .await
            .map_err(Self::map_repository_error)?;
        info!(job_id = %job.id, %parent_id, csv_file_id = %job.csv_file_id, "job derived");
        Ok(job)
    }

    async fn delete_job(&self, job_id: JobId, caller: UserId) -> Result<JobDeletion, Error> {
        self.owned_job(job_id, caller).await?;
        let deletion = self
            .jobs
            .delete_job_cascade(&job_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("job {job_id} not found")))?;
        info!(
            %job_id,
            results_removed = deletion.results_removed,
            children_detached = deletion.children_detached,
            csv_removed = deletion.csv_removed,
            "job deleted"
        );
        Ok(deletion)
    }
}

#[async_trait]
impl<J> JobQuery for JobService<J>
where
    J: JobRepository,
{
    async fn get_job(&self, job_id: JobId) -> Result<Job, Error> {
        self.jobs
            .find_job(&job_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("job {job_id} not found")))
    }

    async fn list_jobs_by_owner(&self, owner: UserId) -> Result<Vec<Job>, Error> {
        self.jobs
            .list_jobs_by_owner(&owner)
            .await
            .map_err(Self::map_repository_error)
    }

    async fn csv_for_job(&self, job_id: JobId, caller: UserId) -> Result<CsvFile, Error> {
        let job = self.owned_job(job_id, caller).await?;
        self.jobs
            .find_csv_file(&job.csv_file_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("artifact for job {job_id} not found")))
    }
}

#[cfg(test)]
#[path = "job_service_tests.rs"]
mod tests;
