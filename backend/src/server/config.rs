//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use portal::domain::EmailAddress;
use portal::domain::ports::Notifier;
use portal::inbound::http::session_config::SessionSettings;
use portal::outbound::mail::TracingNotifier;
use portal::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) redis_url: Option<String>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) admin_email: Option<EmailAddress>,
}

impl ServerConfig {
    /// Start from an in-memory store, cookie sessions and logged email.
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        Self {
            session,
            bind_addr,
            db_pool: None,
            redis_url: None,
            notifier: Arc::new(TracingNotifier),
            admin_email: None,
        }
    }

    /// Persist through PostgreSQL instead of the in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Keep session state in Redis at `url`.
    #[must_use]
    pub fn with_redis_url(mut self, url: Option<String>) -> Self {
        self.redis_url = url;
        self
    }

    /// Deliver email through `notifier`, alerting `admin_email` about new
    /// registrations.
    #[must_use]
    pub fn with_notifier(
        mut self,
        notifier: Arc<dyn Notifier>,
        admin_email: Option<EmailAddress>,
    ) -> Self {
        self.notifier = notifier;
        self.admin_email = admin_email;
        self
    }
}
