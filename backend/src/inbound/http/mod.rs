//! HTTP inbound adapter exposing REST endpoints under `/api/v1`.

pub mod approvals;
pub mod auth;
pub mod envelope;
pub mod error;
pub mod health;
pub mod jobs;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every API handler on the `/api/v1` scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::configure)
        .configure(approvals::configure)
        .configure(users::configure)
        .configure(jobs::configure);
}
