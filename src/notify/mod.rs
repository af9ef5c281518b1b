//! Outbound notification transport for new incident reports.

pub mod smtp;

use async_trait::async_trait;
use tracing::info;

pub use smtp::SmtpNotifier;

/// Transport seam for notifications so the incident service can be exercised
/// without a mail relay.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Notification transport failure.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("message could not be assembled: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport failure: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Stand-in used when no SMTP relay is configured: the notification is
/// recorded in the log instead of delivered.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!(recipient, subject, body, "smtp not configured; notification logged only");
        Ok(())
    }
}
