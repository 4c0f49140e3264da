//! In-memory store implementing every repository port.
//!
//! Used when no database URL is configured and by the HTTP tests. All tables
//! sit behind one mutex so multi-row operations are atomic in the same way
//! the Diesel transactions are. Constraint failures are reported with the
//! PostgreSQL constraint names so services map them identically.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, JobRepository, JobRepositoryError,
    LoginRecordRepository, LoginRecordRepositoryError, NewAccount, Reregistration,
};
use crate::domain::{
    AccountStatus, Approval, ApprovalListing, ApprovalStatus, ApprovalTransition,
    ApprovalVersion, CsvFile, CsvFileId, EmailAddress, Job, JobDeletion, JobId, LoginRecord,
    NewCsvFile, NewJob, ProblemId, Role, User, UserCredentials, UserId, Username,
};

const POISONED: &str = "in-memory store lock poisoned";

struct StoredAccount {
    credentials: UserCredentials,
    approval: Approval,
}

impl StoredAccount {
    fn user(&self) -> &User {
        &self.credentials.user
    }
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<UserId, StoredAccount>,
    login_records: HashMap<UserId, LoginRecord>,
    problems: HashSet<ProblemId>,
    jobs: HashMap<JobId, Job>,
    csv_files: HashMap<CsvFileId, CsvFile>,
    results: HashMap<JobId, u64>,
}

impl MemoryState {
    fn username_holder(&self, username: &Username) -> Option<UserId> {
        self.accounts
            .values()
            .find(|account| account.user().username() == username)
            .map(|account| account.user().id())
    }

    fn email_holder(&self, email: &EmailAddress) -> Option<UserId> {
        self.accounts
            .values()
            .find(|account| account.user().email() == email)
            .map(|account| account.user().id())
    }
}

/// Process-local store for accounts, login records and jobs.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, &'static str> {
        self.state.lock().map_err(|_| POISONED)
    }

    /// Register a problem definition so jobs can reference it.
    pub fn seed_problem(&self, problem_id: ProblemId) -> bool {
        self.lock()
            .map(|mut state| state.problems.insert(problem_id))
            .unwrap_or(false)
    }

    /// Record `count` result rows against a job, as the external runner would.
    pub fn seed_results(&self, job_id: JobId, count: u64) {
        if let Ok(mut state) = self.lock() {
            *state.results.entry(job_id).or_default() += count;
        }
    }
}

fn listing(account: &StoredAccount) -> ApprovalListing {
    let user = account.user();
    ApprovalListing {
        approval: account.approval.clone(),
        email: user.email().clone(),
        role: user.role(),
        profile: user.profile().clone(),
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserCredentials>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state
            .accounts
            .values()
            .find(|account| account.user().username() == username)
            .map(|account| account.credentials.clone()))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state
            .email_holder(email)
            .and_then(|id| state.accounts.get(&id))
            .map(|account| account.user().clone()))
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state.accounts.get(user_id).map(|account| account.user().clone()))
    }

    async fn create_account(
        &self,
        account: &NewAccount,
    ) -> Result<Approval, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        let user = &account.user;
        if state.username_holder(user.username()).is_some() {
            return Err(AccountRepositoryError::duplicate("users_username_key"));
        }
        if state.email_holder(user.email()).is_some() {
            return Err(AccountRepositoryError::duplicate("users_email_key"));
        }
        let approval = Approval {
            user_id: user.id(),
            username: user.username().clone(),
            status: ApprovalStatus::Pending,
            reviewer: None,
            version: ApprovalVersion::initial(),
            rejection_reason: None,
            registered_at: account.registered_at,
            processed_at: account.registered_at,
        };
        state.accounts.insert(
            user.id(),
            StoredAccount {
                credentials: UserCredentials {
                    user: user.clone(),
                    password: account.password.clone(),
                },
                approval: approval.clone(),
            },
        );
        Ok(approval)
    }

    async fn reregister(
        &self,
        request: &Reregistration,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        if state
            .username_holder(&request.username)
            .is_some_and(|holder| holder != request.user_id)
        {
            return Err(AccountRepositoryError::duplicate("users_username_key"));
        }
        let Some(account) = state.accounts.get_mut(&request.user_id) else {
            return Ok(None);
        };
        if account.approval.version != request.expected_version
            || account.approval.status != ApprovalStatus::Rejected
        {
            return Ok(None);
        }

        let previous = account.user();
        account.credentials = UserCredentials {
            user: User::new(
                previous.id(),
                request.username.clone(),
                previous.email().clone(),
                Role::User,
                AccountStatus::Active,
                request.profile.clone(),
            ),
            password: request.password.clone(),
        };
        account.approval = Approval {
            user_id: request.user_id,
            username: request.username.clone(),
            status: ApprovalStatus::ReRegistered,
            reviewer: None,
            version: request.expected_version.next(),
            rejection_reason: None,
            registered_at: request.registered_at,
            processed_at: request.registered_at,
        };
        Ok(Some(account.approval.clone()))
    }

    async fn find_approval(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state.accounts.get(user_id).map(|account| account.approval.clone()))
    }

    async fn transition_approval(
        &self,
        transition: &ApprovalTransition,
    ) -> Result<Option<Approval>, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        let Some(account) = state.accounts.get_mut(&transition.user_id) else {
            return Ok(None);
        };
        let approval = &mut account.approval;
        if approval.version != transition.expected_version {
            return Ok(None);
        }
        approval.status = transition.status;
        approval.reviewer.clone_from(&transition.reviewer);
        approval.rejection_reason.clone_from(&transition.rejection_reason);
        approval.processed_at = transition.processed_at;
        approval.version = transition.expected_version.next();
        Ok(Some(approval.clone()))
    }

    async fn list_approvals(&self) -> Result<Vec<ApprovalListing>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        let mut listings: Vec<ApprovalListing> = state.accounts.values().map(listing).collect();
        listings.sort_by(|a, b| b.approval.registered_at.cmp(&a.approval.registered_at));
        Ok(listings)
    }

    async fn set_role(&self, user_id: &UserId, role: Role) -> Result<bool, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        let Some(account) = state.accounts.get_mut(user_id) else {
            return Ok(false);
        };
        let user = account.user();
        account.credentials.user = User::new(
            user.id(),
            user.username().clone(),
            user.email().clone(),
            role,
            user.status(),
            user.profile().clone(),
        );
        Ok(true)
    }

    async fn delete_account(&self, user_id: &UserId) -> Result<bool, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        if state.jobs.values().any(|job| job.owner == *user_id) {
            return Err(AccountRepositoryError::still_referenced("jobs_owner_id_fkey"));
        }
        state.login_records.remove(user_id);
        Ok(state.accounts.remove(user_id).is_some())
    }
}

#[async_trait]
impl LoginRecordRepository for InMemoryStore {
    async fn upsert(
        &self,
        record: &LoginRecord,
    ) -> Result<LoginRecord, LoginRecordRepositoryError> {
        let mut state = self.lock().map_err(LoginRecordRepositoryError::query)?;
        if !state.accounts.contains_key(&record.user_id) {
            return Err(LoginRecordRepositoryError::query(
                "constraint violated: login_sessions_user_id_fkey",
            ));
        }
        state.login_records.insert(record.user_id, record.clone());
        Ok(record.clone())
    }

    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<LoginRecord>, LoginRecordRepositoryError> {
        let state = self.lock().map_err(LoginRecordRepositoryError::query)?;
        Ok(state.login_records.get(user_id).cloned())
    }
}

fn check_job_references(state: &MemoryState, job: &NewJob) -> Result<(), JobRepositoryError> {
    if !state.accounts.contains_key(&job.owner) {
        return Err(JobRepositoryError::missing_reference("jobs_owner_id_fkey"));
    }
    if job.problem_id.is_some_and(|id| !state.problems.contains(&id)) {
        return Err(JobRepositoryError::missing_reference("jobs_problem_id_fkey"));
    }
    Ok(())
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn problem_exists(&self, problem_id: &ProblemId) -> Result<bool, JobRepositoryError> {
        let state = self.lock().map_err(JobRepositoryError::query)?;
        Ok(state.problems.contains(problem_id))
    }

    async fn create_job_with_csv(
        &self,
        job: &NewJob,
        csv: &NewCsvFile,
    ) -> Result<Job, JobRepositoryError> {
        let mut state = self.lock().map_err(JobRepositoryError::query)?;
        check_job_references(&state, job)?;
        let stored = job.clone().into_job(csv.id);
        state.csv_files.insert(
            csv.id,
            CsvFile {
                metadata: csv.metadata(),
                content: csv.content.clone(),
            },
        );
        state.jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn create_job_sharing_csv(
        &self,
        job: &NewJob,
        csv_file_id: &CsvFileId,
    ) -> Result<Job, JobRepositoryError> {
        let mut state = self.lock().map_err(JobRepositoryError::query)?;
        check_job_references(&state, job)?;
        if !state.csv_files.contains_key(csv_file_id) {
            return Err(JobRepositoryError::missing_reference("jobs_csv_file_id_fkey"));
        }
        let stored = job.clone().into_job(*csv_file_id);
        state.jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_job(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError> {
        let state = self.lock().map_err(JobRepositoryError::query)?;
        Ok(state.jobs.get(job_id).cloned())
    }

    async fn list_jobs_by_owner(&self, owner: &UserId) -> Result<Vec<Job>, JobRepositoryError> {
        let state = self.lock().map_err(JobRepositoryError::query)?;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| job.owner == *owner)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(jobs)
    }

    async fn delete_job_cascade(
        &self,
        job_id: &JobId,
    ) -> Result<Option<JobDeletion>, JobRepositoryError> {
        let mut state = self.lock().map_err(JobRepositoryError::query)?;
        let Some(job) = state.jobs.remove(job_id) else {
            return Ok(None);
        };
        let results_removed = state.results.remove(job_id).unwrap_or(0);
        let mut children_detached = 0;
        for child in state.jobs.values_mut() {
            if child.parent_job_id == Some(*job_id) {
                child.parent_job_id = None;
                children_detached += 1;
            }
        }
        let shared = state
            .jobs
            .values()
            .any(|other| other.csv_file_id == job.csv_file_id);
        let csv_removed = !shared && state.csv_files.remove(&job.csv_file_id).is_some();
        Ok(Some(JobDeletion {
            job_id: *job_id,
            results_removed,
            children_detached,
            csv_removed,
        }))
    }

    async fn find_csv_file(
        &self,
        csv_file_id: &CsvFileId,
    ) -> Result<Option<CsvFile>, JobRepositoryError> {
        let state = self.lock().map_err(JobRepositoryError::query)?;
        Ok(state.csv_files.get(csv_file_id).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
