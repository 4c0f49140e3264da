//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountCommand, AccountQuery, JobCommand, JobQuery, LoginService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountCommand>,
    pub approvals: Arc<dyn AccountQuery>,
    pub login: Arc<dyn LoginService>,
    pub jobs: Arc<dyn JobCommand>,
    pub job_queries: Arc<dyn JobQuery>,
}

impl HttpState {
    /// Build state from services that implement both halves of a workflow.
    ///
    /// The approval service serves account commands and queries; the job
    /// service serves job commands and queries.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use portal::domain::{
    ///     AccountLoginService, ApprovalWorkflowService, JobService, NotificationDispatcher,
    /// };
    /// use portal::inbound::http::state::HttpState;
    /// use portal::outbound::mail::TracingNotifier;
    /// use portal::outbound::memory::InMemoryStore;
    /// use portal::outbound::password::Argon2PasswordHasher;
    ///
    /// let store = Arc::new(InMemoryStore::new());
    /// let hasher = Arc::new(Argon2PasswordHasher::new());
    /// let clock = Arc::new(DefaultClock);
    /// let notifications = NotificationDispatcher::new(Arc::new(TracingNotifier), None);
    /// let state = HttpState::from_services(
    ///     Arc::new(ApprovalWorkflowService::new(
    ///         store.clone(),
    ///         hasher.clone(),
    ///         notifications,
    ///         clock.clone(),
    ///     )),
    ///     Arc::new(AccountLoginService::new(store.clone(), store.clone(), hasher, clock.clone())),
    ///     Arc::new(JobService::new(store, clock)),
    /// );
    /// let _login = state.login.clone();
    /// ```
    pub fn from_services<A, L, J>(accounts: Arc<A>, login: Arc<L>, jobs: Arc<J>) -> Self
    where
        A: AccountCommand + AccountQuery + 'static,
        L: LoginService + 'static,
        J: JobCommand + JobQuery + 'static,
    {
        Self {
            accounts: accounts.clone(),
            approvals: accounts,
            login,
            jobs: jobs.clone(),
            job_queries: jobs,
        }
    }
}
