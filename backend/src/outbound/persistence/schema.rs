//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. When migrations
//! change, regenerate them with `diesel print-schema` or edit them by hand.

diesel::table! {
    /// Registered accounts with their credential and profile.
    users (id) {
        id -> Uuid,
        username -> Varchar,
        /// Stored lower-cased.
        email -> Varchar,
        /// Argon2 PHC string.
        password_hash -> Text,
        role -> Varchar,
        status -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        country -> Nullable<Varchar>,
        affiliation -> Nullable<Varchar>,
        research -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One approval record per account, advanced by version.
    user_approvals (user_id) {
        user_id -> Uuid,
        username -> Varchar,
        status -> Varchar,
        reviewer -> Nullable<Varchar>,
        version -> Int4,
        rejection_reason -> Nullable<Varchar>,
        registered_at -> Timestamptz,
        processed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Last-login metadata, one row per account.
    login_sessions (user_id) {
        user_id -> Uuid,
        login_at -> Timestamptz,
        login_ip -> Nullable<Varchar>,
        expires_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Externally provisioned problem definitions.
    problems (id) {
        id -> Uuid,
        problem_type -> Varchar,
        features -> Varchar,
        algorithms -> Varchar,
    }
}

diesel::table! {
    /// Metrics written by the external job runner.
    job_metrics (id) {
        id -> Uuid,
        primary_metric -> Float8,
        secondary_metric -> Nullable<Float8>,
        started_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Uploaded CSV artifacts, shared between a job and its derived jobs.
    csv_files (id) {
        id -> Uuid,
        filename -> Varchar,
        content -> Text,
        size_bytes -> Int8,
        /// Hex-encoded SHA-256 of `content`.
        checksum -> Varchar,
        uploaded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Submitted jobs. `parent_job_id` is an index reference without a
    /// foreign key.
    jobs (id) {
        id -> Uuid,
        owner_id -> Uuid,
        parent_job_id -> Nullable<Uuid>,
        problem_id -> Nullable<Uuid>,
        csv_file_id -> Uuid,
        metrics_id -> Nullable<Uuid>,
        name -> Nullable<Varchar>,
        phase -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Result rows written by the external job runner.
    results (id) {
        id -> Uuid,
        job_id -> Uuid,
        primary_output -> Text,
        secondary_output -> Text,
    }
}

diesel::joinable!(user_approvals -> users (user_id));
diesel::joinable!(login_sessions -> users (user_id));
diesel::joinable!(jobs -> users (owner_id));
diesel::joinable!(jobs -> problems (problem_id));
diesel::joinable!(jobs -> csv_files (csv_file_id));
diesel::joinable!(jobs -> job_metrics (metrics_id));
diesel::joinable!(results -> jobs (job_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    user_approvals,
    login_sessions,
    problems,
    job_metrics,
    csv_files,
    jobs,
    results,
);
