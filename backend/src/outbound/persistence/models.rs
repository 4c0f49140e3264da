//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live next
//! to the repositories that use them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{csv_files, jobs, login_sessions, user_approvals, users};

// ---------------------------------------------------------------------------
// Account models
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub country: Option<String>,
    pub affiliation: Option<String>,
    pub research: Option<String>,
}

/// Insertable struct for creating accounts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub status: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub country: Option<&'a str>,
    pub affiliation: Option<&'a str>,
    pub research: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset overwriting a rejected account on re-registration.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ReregistrationUpdate<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub status: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub country: Option<&'a str>,
    pub affiliation: Option<&'a str>,
    pub research: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the user_approvals table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_approvals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ApprovalRow {
    pub user_id: Uuid,
    pub username: String,
    pub status: String,
    pub reviewer: Option<String>,
    pub version: i32,
    pub rejection_reason: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Insertable struct for the initial approval of an account.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_approvals)]
pub(crate) struct NewApprovalRow<'a> {
    pub user_id: Uuid,
    pub username: &'a str,
    pub status: &'a str,
    pub version: i32,
    pub registered_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Changeset applied by a versioned approval write.
///
/// `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = user_approvals)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ApprovalUpdate<'a> {
    pub status: &'a str,
    pub reviewer: Option<&'a str>,
    pub version: i32,
    pub rejection_reason: Option<&'a str>,
    pub processed_at: DateTime<Utc>,
}

/// Row struct for reading and upserting login metadata.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = login_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct LoginSessionRow {
    pub user_id: Uuid,
    pub login_at: DateTime<Utc>,
    pub login_ip: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Job models
// ---------------------------------------------------------------------------

/// Row struct for reading from the jobs table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct JobRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub parent_job_id: Option<Uuid>,
    pub problem_id: Option<Uuid>,
    pub csv_file_id: Uuid,
    pub metrics_id: Option<Uuid>,
    pub name: Option<String>,
    pub phase: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable struct for creating jobs.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = jobs)]
pub(crate) struct NewJobRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub parent_job_id: Option<Uuid>,
    pub problem_id: Option<Uuid>,
    pub csv_file_id: Uuid,
    pub name: Option<&'a str>,
    pub phase: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Artifact metadata without its content.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = csv_files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CsvFileMetadataRow {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Artifact including its content.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = csv_files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CsvFileRow {
    #[diesel(embed)]
    pub metadata: CsvFileMetadataRow,
    pub content: String,
}

/// Insertable struct for creating artifacts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = csv_files)]
pub(crate) struct NewCsvFileRow<'a> {
    pub id: Uuid,
    pub filename: &'a str,
    pub content: &'a str,
    pub size_bytes: i64,
    pub checksum: &'a str,
    pub uploaded_at: DateTime<Utc>,
}
