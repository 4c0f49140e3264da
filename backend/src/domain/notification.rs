//! Best-effort email notifications for registration events.
//!
//! Messages are sent from detached tasks after the triggering write has
//! committed. Delivery failures are logged and never reach the caller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ports::{EmailMessage, Notifier};
use super::{EmailAddress, TraceId, Username};

/// Subject of the administrator notification.
pub const REGISTRATION_SUBJECT: &str = "new user register";
/// Subject of the rejection notification.
pub const REJECTION_SUBJECT: &str = "[register fail]";

/// Fire-and-forget dispatcher in front of a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    admin: Option<EmailAddress>,
}

impl NotificationDispatcher {
    /// Create a dispatcher. Without an administrator address, registration
    /// notices are skipped.
    pub fn new(notifier: Arc<dyn Notifier>, admin: Option<EmailAddress>) -> Self {
        Self { notifier, admin }
    }

    /// Tell the administrator that an account awaits review.
    pub fn registration_received(
        &self,
        username: &Username,
        email: &EmailAddress,
    ) -> Option<JoinHandle<()>> {
        let Some(admin) = self.admin.clone() else {
            debug!(%username, "no administrator address configured; skipping notice");
            return None;
        };
        let body = format!(
            "Users requiring your approval:\n\n  username: {username}, email: {email}\n"
        );
        Some(self.dispatch(EmailMessage {
            to: admin,
            subject: REGISTRATION_SUBJECT.to_owned(),
            body,
        }))
    }

    /// Tell an applicant that their registration was rejected.
    pub fn registration_rejected(
        &self,
        username: &Username,
        email: &EmailAddress,
        reason: Option<&str>,
    ) -> JoinHandle<()> {
        let reason = reason.filter(|r| !r.trim().is_empty()).unwrap_or("not specified");
        let body = format!(
            "Dear {username},\n\n\
             Your registration request has been reviewed and was not approved.\n\
             Reason: {reason}\n\n\
             You may register again using the same email address.\n"
        );
        self.dispatch(EmailMessage {
            to: email.clone(),
            subject: REJECTION_SUBJECT.to_owned(),
            body,
        })
    }

    fn dispatch(&self, message: EmailMessage) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        TraceId::spawn(async move {
            match notifier.send(&message).await {
                Ok(()) => info!(to = %message.to, subject = %message.subject, "notification sent"),
                Err(err) => warn!(
                    to = %message.to,
                    subject = %message.subject,
                    error = %err,
                    "notification failed"
                ),
            }
        })
    }
}
