//! Per-test databases cloned from a migrated template on a shared cluster.
//!
//! The template name carries a hash of `backend/migrations`, so schema
//! changes provision a fresh template. Seeding goes through the synchronous
//! `postgres` client and must run outside any Tokio runtime.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::test_support::{hash_directory, shared_cluster_handle};
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use portal::domain::{JobId, ProblemId, UserId};
use portal::outbound::persistence::MIGRATIONS;
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "portal_template";
const PROVISION_RETRIES: usize = 5;
const PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A migrated database dropped when the value goes out of scope.
pub struct TestDatabase {
    url: String,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&self) -> Result<Client, String> {
        Client::connect(&self.url, NoTls).map_err(|err| format_postgres_error(&err))
    }

    /// Insert a problem definition jobs can reference.
    pub fn seed_problem(&self) -> Result<ProblemId, String> {
        let id = Uuid::new_v4();
        self.client()?
            .execute(
                "INSERT INTO problems (id, problem_type, features, algorithms) \
                 VALUES ($1, 'classification', 'feature', 'forest')",
                &[&id],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(ProblemId::from_uuid(id))
    }

    /// Insert `count` result rows for a job, as the external runner would.
    pub fn seed_results(&self, job_id: JobId, count: usize) -> Result<(), String> {
        let mut client = self.client()?;
        for n in 0..count {
            client
                .execute(
                    "INSERT INTO results (id, job_id, primary_output, secondary_output) \
                     VALUES ($1, $2, $3, '')",
                    &[&Uuid::new_v4(), job_id.as_uuid(), &format!("row {n}")],
                )
                .map_err(|err| format_postgres_error(&err))?;
        }
        Ok(())
    }

    /// Insert an approved administrator holding `password_hash`.
    pub fn seed_admin(&self, username: &str, password_hash: &str) -> Result<UserId, String> {
        let id = Uuid::new_v4();
        let email = format!("{username}@example.org");
        let mut client = self.client()?;
        client
            .execute(
                "INSERT INTO users \
                 (id, username, email, password_hash, role, first_name, last_name) \
                 VALUES ($1, $2, $3, $4, 'admin', 'Root', 'Admin')",
                &[&id, &username, &email, &password_hash],
            )
            .map_err(|err| format_postgres_error(&err))?;
        client
            .execute(
                "INSERT INTO user_approvals (user_id, username, status, reviewer, version) \
                 VALUES ($1, $2, 'approved', 'bootstrap', 2)",
                &[&id, &username],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(UserId::from_uuid(id))
    }

    /// Count rows in `table`.
    pub fn count(&self, table: &str) -> Result<i64, String> {
        let row = self
            .client()?
            .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, String> {
    let hash = hash_directory(migrations_dir()).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

fn migrate(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

fn ensure_template(cluster: &ClusterHandle) -> Result<String, String> {
    let template = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());
    let exists = cluster
        .database_exists(template.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        migrate(&cluster.connection().database_url(&template))?;
    }
    Ok(template)
}

fn provision(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let mut last_error = String::new();
    for attempt in 1..=PROVISION_RETRIES {
        let result = ensure_template(cluster).and_then(|template| {
            cluster
                .temporary_database_from_template(
                    format!("test_{}", Uuid::new_v4()).as_str(),
                    template.as_str(),
                )
                .map_err(|err| format!("clone template: {err:?}"))
        });
        match result {
            Ok(database) => return Ok(database),
            Err(error) => last_error = format!("attempt {attempt}/{PROVISION_RETRIES}: {error}"),
        }
        std::thread::sleep(PROVISION_RETRY_DELAY);
    }
    Err(last_error)
}

fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns threads; the
        // shared cluster singleton serialises the first call.
        unsafe {
            std::env::set_var("PG_PASSWORD", "portal_embedded_test");
        }
    }
}

/// Provision a migrated database, or `None` when `SKIP_TEST_CLUSTER` allows
/// skipping a cluster that cannot start.
pub fn test_database() -> Option<TestDatabase> {
    ensure_stable_password();
    let result = shared_cluster_handle()
        .map_err(|err| format!("shared cluster: {err:?}"))
        .and_then(provision);
    match result {
        Ok(database) => Some(TestDatabase {
            url: database.url().to_owned(),
            _database: database,
        }),
        Err(reason) => super::handle_cluster_setup_failure(reason),
    }
}
