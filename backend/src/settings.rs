//! Server configuration loaded via OrthoConfig.
//!
//! Values layer CLI flags over `PORTAL_*` environment variables over an
//! optional configuration file. Session cookie settings are read separately
//! by [`crate::inbound::http::session_config`].

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::EmailAddress;
use crate::outbound::mail::DEFAULT_MAIL_TIMEOUT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_SIZE: u32 = 8;

/// Configuration errors detected after loading.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid bind address '{value}'")]
    InvalidBindAddr { value: String },
    #[error("invalid email address for {field}: '{value}'")]
    InvalidEmail { field: &'static str, value: String },
    #[error("invalid mail relay URL '{value}'")]
    InvalidRelayUrl { value: String },
    #[error("mail_sender is required when mail_relay_url is set")]
    MissingSender,
}

/// Mail relay endpoint and sender address.
#[derive(Debug, Clone)]
pub struct MailRelaySettings {
    pub endpoint: Url,
    pub sender: EmailAddress,
    pub timeout: Duration,
}

/// Server settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTAL")]
pub struct PortalSettings {
    /// Socket address to listen on; defaults to `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without one the server keeps state in memory.
    pub database_url: Option<String>,
    pub pool_size: Option<u32>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
    /// HTTP mail relay endpoint. Without one emails are only logged.
    pub mail_relay_url: Option<String>,
    pub mail_sender: Option<String>,
    /// Administrator mailbox notified about new registrations.
    pub admin_email: Option<String>,
    pub mail_timeout_secs: Option<u64>,
    /// Redis URL for server-side sessions; cookie sessions otherwise.
    pub redis_url: Option<String>,
}

impl PortalSettings {
    /// Parse the listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim()
            .parse()
            .map_err(|_| SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
            })
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn mail_timeout(&self) -> Duration {
        self.mail_timeout_secs
            .map_or(DEFAULT_MAIL_TIMEOUT, Duration::from_secs)
    }

    /// Administrator address, if configured.
    pub fn admin_email(&self) -> Result<Option<EmailAddress>, SettingsError> {
        self.admin_email
            .as_deref()
            .map(|raw| parse_email("admin_email", raw))
            .transpose()
    }

    /// Relay settings, if a relay URL is configured.
    pub fn mail_relay(&self) -> Result<Option<MailRelaySettings>, SettingsError> {
        let Some(raw_url) = self.mail_relay_url.as_deref() else {
            return Ok(None);
        };
        let endpoint = Url::parse(raw_url).map_err(|_| SettingsError::InvalidRelayUrl {
            value: raw_url.to_owned(),
        })?;
        let sender = self
            .mail_sender
            .as_deref()
            .ok_or(SettingsError::MissingSender)
            .and_then(|raw| parse_email("mail_sender", raw))?;
        Ok(Some(MailRelaySettings {
            endpoint,
            sender,
            timeout: self.mail_timeout(),
        }))
    }
}

fn parse_email(field: &'static str, raw: &str) -> Result<EmailAddress, SettingsError> {
    EmailAddress::new(raw).map_err(|_| SettingsError::InvalidEmail {
        field,
        value: raw.to_owned(),
    })
}
