//! Mail adapters for the `Notifier` port.
//!
//! [`HttpMailRelay`] hands each message to an HTTP-to-SMTP relay sidecar and
//! never speaks SMTP itself. [`TracingNotifier`] only logs messages and is
//! used when no relay is configured.
//!
//! # Relay contract
//!
//! One `POST` to the configured endpoint per message, with
//! `Content-Type: application/json` and this body:
//!
//! ```json
//! {
//!   "from": "portal@example.org",
//!   "to": "admin@example.org",
//!   "subject": "new user register",
//!   "text": "plain-text body"
//! }
//! ```
//!
//! All four fields are required strings and `text` is plain text. Any 2xx
//! status means the relay accepted the message for SMTP delivery. Other
//! statuses are reported as [`NotifierError::Rejected`] with a truncated
//! preview of the response body, and the call is bounded by the configured
//! timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::info;

use crate::domain::EmailAddress;
use crate::domain::ports::{EmailMessage, Notifier, NotifierError};

/// Default bound on a single relay call.
pub const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Notifier delivering through an HTTP mail relay.
pub struct HttpMailRelay {
    client: Client,
    endpoint: Url,
    sender: EmailAddress,
}

impl HttpMailRelay {
    /// Build a relay client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        sender: EmailAddress,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            sender,
        })
    }
}

#[async_trait]
impl Notifier for HttpMailRelay {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        let payload = RelayPayload {
            from: self.sender.as_ref(),
            to: message.to.as_ref(),
            subject: &message.subject,
            text: &message.body,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> NotifierError {
    if error.is_timeout() {
        NotifierError::transport(format!("mail relay timed out: {error}"))
    } else {
        NotifierError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> NotifierError {
    NotifierError::rejected(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
        format!("{preview}...")
    } else {
        compact
    }
}

/// Notifier that writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail relay not configured; logging message"
        );
        Ok(())
    }
}
