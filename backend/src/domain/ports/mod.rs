//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod account_workflow;
mod job_repository;
mod job_workflow;
mod login_record_repository;
mod login_service;
mod notifier;
mod password_hasher;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{AccountRepository, AccountRepositoryError, NewAccount, Reregistration};
pub use account_workflow::{
    AccountCommand, AccountQuery, RegistrationKind, RegistrationOutcome, RejectionRequest,
};
#[cfg(test)]
pub use job_repository::MockJobRepository;
pub use job_repository::{JobRepository, JobRepositoryError};
pub use job_workflow::{CreateJobRequest, CreatedJob, JobCommand, JobQuery};
#[cfg(test)]
pub use login_record_repository::MockLoginRecordRepository;
pub use login_record_repository::{LoginRecordRepository, LoginRecordRepositoryError};
pub use login_service::LoginService;
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{EmailMessage, Notifier, NotifierError};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
