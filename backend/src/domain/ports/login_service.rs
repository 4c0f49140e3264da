//! Driving port for login/authentication use-cases.
//!
//! In hexagonal terms this is a *driving* port: inbound adapters call it to
//! authenticate credentials without knowing (or importing) the backing
//! infrastructure.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::domain::{AuthenticatedUser, Error, LoginCredentials, LoginRecord, UserId};

/// Domain use-case port for authentication.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and approval state.
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthenticatedUser, Error>;

    /// Store last-login metadata for an authenticated user.
    async fn record_login(&self, user_id: UserId, ip: Option<IpAddr>) -> Result<LoginRecord, Error>;
}
