//! Jobs submitted by users, each bound to the CSV artifact it was created with.
//!
//! Status follows `pending -> running -> {completed, failed}` and is advanced
//! by an external worker. Phase is an independent free-form label.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::csv_artifact::CsvFileId;
use super::error::Error;
use super::user::UserId;

/// Phase assigned to new jobs when the caller does not choose one.
pub const DEFAULT_JOB_PHASE: &str = "preprocessing";
/// Maximum length for job names and phases.
pub const JOB_LABEL_MAX: usize = 255;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

pub(crate) use uuid_identifier;

uuid_identifier!(
    /// Identifier of a submitted job.
    JobId
);
uuid_identifier!(
    /// Identifier of a problem definition a job is solved against.
    ProblemId
);
uuid_identifier!(
    /// Identifier of the metrics row an external worker maintains for a job.
    MetricsId
);

/// Execution status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Raised when a stored job status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownJobStatus(other.to_owned())),
        }
    }
}

/// Errors raised while validating job metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobMetadataError {
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

fn bounded_label(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<String>, JobMetadataError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > JOB_LABEL_MAX {
        return Err(JobMetadataError::TooLong {
            field,
            max: JOB_LABEL_MAX,
        });
    }
    Ok(Some(value.to_owned()))
}

/// Caller-chosen labels for a new job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMetadata {
    name: Option<String>,
    phase: String,
}

impl JobMetadata {
    /// Validate the labels; a missing phase falls back to
    /// [`DEFAULT_JOB_PHASE`].
    ///
    /// # Examples
    /// ```
    /// use portal::domain::JobMetadata;
    ///
    /// let meta = JobMetadata::try_from_parts(Some("baseline"), None).unwrap();
    /// assert_eq!(meta.phase(), "preprocessing");
    /// ```
    pub fn try_from_parts(
        name: Option<&str>,
        phase: Option<&str>,
    ) -> Result<Self, JobMetadataError> {
        Ok(Self {
            name: bounded_label("job name", name)?,
            phase: bounded_label("job phase", phase)?
                .unwrap_or_else(|| DEFAULT_JOB_PHASE.to_owned()),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }
}

impl Default for JobMetadata {
    fn default() -> Self {
        Self {
            name: None,
            phase: DEFAULT_JOB_PHASE.to_owned(),
        }
    }
}

/// Stored job.
///
/// ## Invariants
/// - `csv_file_id` always references an existing artifact; the two are
///   created in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[schema(value_type = String)]
    pub id: JobId,
    #[schema(value_type = String)]
    pub owner: UserId,
    #[schema(value_type = Option<String>)]
    pub parent_job_id: Option<JobId>,
    #[schema(value_type = Option<String>)]
    pub problem_id: Option<ProblemId>,
    #[schema(value_type = String)]
    pub csv_file_id: CsvFileId,
    #[schema(value_type = Option<String>)]
    pub metrics_id: Option<MetricsId>,
    pub name: Option<String>,
    pub phase: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Fail with [`Error::forbidden`] unless `caller` owns the job.
    pub fn ensure_owned_by(&self, caller: UserId) -> Result<(), Error> {
        if self.owner == caller {
            Ok(())
        } else {
            Err(Error::forbidden("job belongs to another user"))
        }
    }
}

/// Job row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub id: JobId,
    pub owner: UserId,
    pub parent_job_id: Option<JobId>,
    pub problem_id: Option<ProblemId>,
    pub name: Option<String>,
    pub phase: String,
    pub created_at: DateTime<Utc>,
}

impl NewJob {
    /// Materialise the stored form once the artifact id is known.
    pub fn into_job(self, csv_file_id: CsvFileId) -> Job {
        Job {
            id: self.id,
            owner: self.owner,
            parent_job_id: self.parent_job_id,
            problem_id: self.problem_id,
            csv_file_id,
            metrics_id: None,
            name: self.name,
            phase: self.phase,
            status: JobStatus::Pending,
            created_at: self.created_at,
            updated_at: self.created_at,
            completed_at: None,
        }
    }
}

/// Outcome of a cascading job deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDeletion {
    #[schema(value_type = String)]
    pub job_id: JobId,
    pub results_removed: u64,
    pub children_detached: u64,
    pub csv_removed: bool,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn job() -> Job {
        NewJob {
            id: JobId::random(),
            owner: UserId::random(),
            parent_job_id: None,
            problem_id: None,
            name: Some("baseline".to_owned()),
            phase: DEFAULT_JOB_PHASE.to_owned(),
            created_at: Utc::now(),
        }
        .into_job(CsvFileId::random())
    }

    #[rstest]
    fn new_jobs_start_pending(job: Job) {
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.completed_at.is_none());
    }

    #[rstest]
    fn ownership_check_allows_owner(job: Job) {
        assert!(job.ensure_owned_by(job.owner).is_ok());
    }

    #[rstest]
    fn ownership_check_forbids_others(job: Job) {
        let err = job
            .ensure_owned_by(UserId::random())
            .expect_err("other users are forbidden");
        assert_eq!(err.code(), crate::domain::ErrorCode::Forbidden);
    }

    #[rstest]
    #[case(None, None, None, DEFAULT_JOB_PHASE)]
    #[case(Some(" run "), Some(" training "), Some("run"), "training")]
    #[case(Some("  "), Some(""), None, DEFAULT_JOB_PHASE)]
    fn metadata_normalises_labels(
        #[case] name: Option<&str>,
        #[case] phase: Option<&str>,
        #[case] expected_name: Option<&str>,
        #[case] expected_phase: &str,
    ) {
        let meta = JobMetadata::try_from_parts(name, phase).expect("valid metadata");
        assert_eq!(meta.name(), expected_name);
        assert_eq!(meta.phase(), expected_phase);
    }

    #[rstest]
    fn metadata_rejects_overlong_names() {
        let long = "x".repeat(JOB_LABEL_MAX + 1);
        assert!(JobMetadata::try_from_parts(Some(&long), None).is_err());
    }

    #[rstest]
    #[case("pending", JobStatus::Pending)]
    #[case("completed", JobStatus::Completed)]
    fn parses_status(#[case] raw: &str, #[case] expected: JobStatus) {
        assert_eq!(raw.parse::<JobStatus>().expect("known status"), expected);
    }
}
