//! PostgreSQL-backed `JobRepository` implementation using Diesel ORM.
//!
//! A job and its artifact are inserted together. Cascading deletes lock the
//! artifact row first and then every job row they touch in id order, so
//! concurrent deletions of related jobs queue on the artifact instead of
//! deadlocking, and neither can conclude that the other still references it.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use uuid::Uuid;

use crate::domain::ports::{JobRepository, JobRepositoryError};
use crate::domain::{
    CsvFile, CsvFileId, CsvFileMetadata, Job, JobDeletion, JobId, JobStatus, MetricsId,
    NewCsvFile, NewJob, ProblemId, UserId,
};

use super::diesel_basic_error_mapping::{DieselFailure, classify_diesel_error, pool_failure};
use super::models::{CsvFileMetadataRow, CsvFileRow, JobRow, NewCsvFileRow, NewJobRow};
use super::pool::{DbPool, PoolError};
use super::schema::{csv_files, jobs, problems, results};

/// Diesel-backed implementation of the [`JobRepository`] port.
#[derive(Clone)]
pub struct DieselJobRepository {
    pool: DbPool,
}

impl DieselJobRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DieselFailure) -> JobRepositoryError {
    match failure {
        DieselFailure::Connection(message) => JobRepositoryError::connection(message),
        DieselFailure::ForeignKeyViolation { constraint } => {
            JobRepositoryError::missing_reference(constraint)
        }
        DieselFailure::UniqueViolation { constraint } => {
            JobRepositoryError::query(format!("constraint violated: {constraint}"))
        }
        DieselFailure::Query(message) => JobRepositoryError::query(message),
    }
}

fn map_pool_error(error: PoolError) -> JobRepositoryError {
    map_failure(pool_failure(error))
}

fn map_diesel_error(error: diesel::result::Error) -> JobRepositoryError {
    map_failure(classify_diesel_error(error))
}

fn row_to_job(row: JobRow) -> Result<Job, JobRepositoryError> {
    let status = JobStatus::from_str(&row.status)
        .map_err(|err| JobRepositoryError::query(format!("stored job is invalid: {err}")))?;
    Ok(Job {
        id: JobId::from_uuid(row.id),
        owner: UserId::from_uuid(row.owner_id),
        parent_job_id: row.parent_job_id.map(JobId::from_uuid),
        problem_id: row.problem_id.map(ProblemId::from_uuid),
        csv_file_id: CsvFileId::from_uuid(row.csv_file_id),
        metrics_id: row.metrics_id.map(MetricsId::from_uuid),
        name: row.name,
        phase: row.phase,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
        completed_at: row.completed_at,
    })
}

fn row_to_metadata(row: CsvFileMetadataRow) -> CsvFileMetadata {
    CsvFileMetadata {
        id: CsvFileId::from_uuid(row.id),
        filename: row.filename,
        size_bytes: row.size_bytes,
        checksum: row.checksum,
        uploaded_at: row.uploaded_at,
    }
}

fn new_job_row<'a>(job: &'a NewJob, csv_file_id: &CsvFileId) -> NewJobRow<'a> {
    NewJobRow {
        id: *job.id.as_uuid(),
        owner_id: *job.owner.as_uuid(),
        parent_job_id: job.parent_job_id.map(|id| *id.as_uuid()),
        problem_id: job.problem_id.map(|id| *id.as_uuid()),
        csv_file_id: *csv_file_id.as_uuid(),
        name: job.name.as_deref(),
        phase: &job.phase,
        status: JobStatus::Pending.as_str(),
        created_at: job.created_at,
        updated_at: job.created_at,
    }
}

fn affected(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

#[async_trait]
impl JobRepository for DieselJobRepository {
    async fn problem_exists(&self, problem_id: &ProblemId) -> Result<bool, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(problems::table.find(problem_id.as_uuid())))
            .get_result::<bool>(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn create_job_with_csv(
        &self,
        job: &NewJob,
        csv: &NewCsvFile,
    ) -> Result<Job, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let csv_row = NewCsvFileRow {
            id: *csv.id.as_uuid(),
            filename: &csv.filename,
            content: &csv.content,
            size_bytes: csv.size_bytes,
            checksum: &csv.checksum,
            uploaded_at: csv.uploaded_at,
        };
        let job_row = new_job_row(job, &csv.id);

        let row = conn
            .transaction(|conn| {
                async move {
                    diesel::insert_into(csv_files::table)
                        .values(&csv_row)
                        .execute(conn)
                        .await?;
                    diesel::insert_into(jobs::table)
                        .values(&job_row)
                        .returning(JobRow::as_returning())
                        .get_result::<JobRow>(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        row_to_job(row)
    }

    async fn create_job_sharing_csv(
        &self,
        job: &NewJob,
        csv_file_id: &CsvFileId,
    ) -> Result<Job, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: JobRow = diesel::insert_into(jobs::table)
            .values(&new_job_row(job, csv_file_id))
            .returning(JobRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_job(row)
    }

    async fn find_job(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<JobRow> = jobs::table
            .find(job_id.as_uuid())
            .select(JobRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_job).transpose()
    }

    async fn list_jobs_by_owner(&self, owner: &UserId) -> Result<Vec<Job>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<JobRow> = jobs::table
            .filter(jobs::owner_id.eq(owner.as_uuid()))
            .select(JobRow::as_select())
            .order_by((jobs::created_at.desc(), jobs::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_job).collect()
    }

    async fn delete_job_cascade(
        &self,
        job_id: &JobId,
    ) -> Result<Option<JobDeletion>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = *job_id.as_uuid();
        let job_id = *job_id;

        conn.transaction(|conn| {
            async move {
                let Some(csv_id) = jobs::table
                    .find(id)
                    .select(jobs::csv_file_id)
                    .first::<Uuid>(conn)
                    .await
                    .optional()?
                else {
                    return Ok::<_, diesel::result::Error>(None);
                };

                csv_files::table
                    .find(csv_id)
                    .select(csv_files::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?;

                let locked: Vec<Uuid> = jobs::table
                    .filter(jobs::csv_file_id.eq(csv_id))
                    .or_filter(jobs::id.eq(id))
                    .or_filter(jobs::parent_job_id.eq(id))
                    .select(jobs::id)
                    .order_by(jobs::id.asc())
                    .for_update()
                    .load(conn)
                    .await?;
                if !locked.contains(&id) {
                    return Ok(None);
                }

                let results_removed =
                    diesel::delete(results::table.filter(results::job_id.eq(id)))
                        .execute(conn)
                        .await?;
                let children_detached =
                    diesel::update(jobs::table.filter(jobs::parent_job_id.eq(id)))
                        .set(jobs::parent_job_id.eq(None::<Uuid>))
                        .execute(conn)
                        .await?;
                diesel::delete(jobs::table.find(id)).execute(conn).await?;

                let remaining: i64 = jobs::table
                    .filter(jobs::csv_file_id.eq(csv_id))
                    .count()
                    .get_result(conn)
                    .await?;
                let csv_removed = if remaining == 0 {
                    diesel::delete(csv_files::table.find(csv_id))
                        .execute(conn)
                        .await?
                        > 0
                } else {
                    false
                };

                Ok(Some(JobDeletion {
                    job_id,
                    results_removed: affected(results_removed),
                    children_detached: affected(children_detached),
                    csv_removed,
                }))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find_csv_file(
        &self,
        csv_file_id: &CsvFileId,
    ) -> Result<Option<CsvFile>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CsvFileRow> = csv_files::table
            .find(csv_file_id.as_uuid())
            .select(CsvFileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(|row| CsvFile {
            metadata: row_to_metadata(row.metadata),
            content: row.content,
        }))
    }
}
