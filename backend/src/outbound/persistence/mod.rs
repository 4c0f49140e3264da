//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories translate between internal row structs and domain types and
//! hold no workflow logic. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```ignore
//! use portal::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/portal")).await?;
//! let accounts = DieselAccountRepository::new(pool);
//! ```

mod diesel_account_repository;
mod diesel_basic_error_mapping;
mod diesel_job_repository;
mod diesel_login_record_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use diesel_job_repository::DieselJobRepository;
pub use diesel_login_record_repository::DieselLoginRecordRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
