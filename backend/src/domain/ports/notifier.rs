//! Port for outbound email.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::EmailAddress;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail adapters.
    pub enum NotifierError {
        /// The relay could not be reached.
        Transport { message: String } => "mail transport failed: {message}",
        /// The relay answered but refused the message.
        Rejected { status: u16, message: String } =>
            "mail relay rejected message ({status}): {message}",
    }
}

/// Plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

/// Delivers email. Callers treat delivery as best effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message.
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError>;
}
