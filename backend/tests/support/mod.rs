//! Shared helpers for the embedded PostgreSQL integration suites.

#![allow(dead_code, reason = "each suite uses a subset of the helpers")]

pub mod cluster_skip;
pub mod embedded_postgres;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::{TestDatabase, test_database};

/// Render a `postgres` error with the server message and SQLSTATE.
///
/// The `Display` implementation collapses database errors to `db error`,
/// which hides the useful part in CI logs.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!("postgres error {:?}: {}", db_error.code(), db_error.message());
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}
