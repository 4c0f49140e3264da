//! Builders wiring domain services onto the configured stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use portal::domain::ports::{
    AccountRepository, JobRepository, LoginRecordRepository, PasswordHasher,
};
use portal::domain::{
    AccountLoginService, ApprovalWorkflowService, JobService, NotificationDispatcher,
};
use portal::inbound::http::state::HttpState;
use portal::outbound::memory::InMemoryStore;
use portal::outbound::password::Argon2PasswordHasher;
use portal::outbound::persistence::{
    DieselAccountRepository, DieselJobRepository, DieselLoginRecordRepository,
};

use super::ServerConfig;

/// Stores backing the three repository ports.
struct Stores<A, L, J> {
    accounts: Arc<A>,
    login_records: Arc<L>,
    jobs: Arc<J>,
}

fn login_ttl(ttl: Duration) -> Option<TimeDelta> {
    match TimeDelta::from_std(ttl) {
        Ok(ttl) => Some(ttl),
        Err(err) => {
            warn!(error = %err, "session ttl out of range; login records will not expire");
            None
        }
    }
}

fn wire<A, L, J>(stores: Stores<A, L, J>, config: &ServerConfig) -> HttpState
where
    A: AccountRepository + 'static,
    L: LoginRecordRepository + 'static,
    J: JobRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    let notifications =
        NotificationDispatcher::new(config.notifier.clone(), config.admin_email.clone());

    let accounts = ApprovalWorkflowService::new(
        stores.accounts.clone(),
        hasher.clone(),
        notifications,
        clock.clone(),
    );
    let mut login =
        AccountLoginService::new(stores.accounts, stores.login_records, hasher, clock.clone());
    if let Some(ttl) = login_ttl(config.session.ttl) {
        login = login.with_session_ttl(ttl);
    }
    let jobs = JobService::new(stores.jobs, clock);

    HttpState::from_services(Arc::new(accounts), Arc::new(login), Arc::new(jobs))
}

/// Build handler state over PostgreSQL when a pool is configured, otherwise
/// over a process-local store.
pub(crate) fn build_http_state(config: &ServerConfig) -> HttpState {
    match &config.db_pool {
        Some(pool) => {
            info!("using PostgreSQL persistence");
            wire(
                Stores {
                    accounts: Arc::new(DieselAccountRepository::new(pool.clone())),
                    login_records: Arc::new(DieselLoginRecordRepository::new(pool.clone())),
                    jobs: Arc::new(DieselJobRepository::new(pool.clone())),
                },
                config,
            )
        }
        None => {
            warn!("no database configured; state is held in memory and lost on restart");
            let store = Arc::new(InMemoryStore::new());
            wire(
                Stores {
                    accounts: store.clone(),
                    login_records: store.clone(),
                    jobs: store,
                },
                config,
            )
        }
    }
}
