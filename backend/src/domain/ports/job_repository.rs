//! Port for jobs, their CSV artifacts and dependent result rows.
//!
//! Multi-row operations are atomic: a job is never stored without its
//! artifact, and a cascading delete either removes everything it should or
//! nothing at all.

use async_trait::async_trait;

use crate::domain::{
    CsvFile, CsvFileId, Job, JobDeletion, JobId, NewCsvFile, NewJob, ProblemId, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by job repository adapters.
    pub enum JobRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "job repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "job repository query failed: {message}",
        /// A referenced row (problem, parent job, artifact) disappeared.
        MissingReference { message: String } =>
            "job references a missing row: {message}",
    }
}

/// Port for job storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Whether a problem definition exists.
    async fn problem_exists(&self, problem_id: &ProblemId) -> Result<bool, JobRepositoryError>;

    /// Insert the artifact and the job referencing it in one transaction.
    async fn create_job_with_csv(
        &self,
        job: &NewJob,
        csv: &NewCsvFile,
    ) -> Result<Job, JobRepositoryError>;

    /// Insert a job that shares an existing artifact.
    async fn create_job_sharing_csv(
        &self,
        job: &NewJob,
        csv_file_id: &CsvFileId,
    ) -> Result<Job, JobRepositoryError>;

    /// Fetch a job by id.
    async fn find_job(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError>;

    /// List the jobs a user owns, newest first.
    async fn list_jobs_by_owner(&self, owner: &UserId) -> Result<Vec<Job>, JobRepositoryError>;

    /// Delete a job with its results, detach its children, and remove its
    /// artifact when no other job references it. Returns `None` when the job
    /// does not exist.
    async fn delete_job_cascade(
        &self,
        job_id: &JobId,
    ) -> Result<Option<JobDeletion>, JobRepositoryError>;

    /// Fetch an artifact with its content.
    async fn find_csv_file(
        &self,
        csv_file_id: &CsvFileId,
    ) -> Result<Option<CsvFile>, JobRepositoryError>;
}
