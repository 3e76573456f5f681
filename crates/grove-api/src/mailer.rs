use thiserror::Error;
use tracing::info;

use grove_db::OutgoingEmail;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MailError(pub String);

/// Delivers forwarded stories. Called while the forwarding transaction is
/// open, so it must not touch the database.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Writes each message to the log and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            recipient = %email.recipient,
            subject = %email.subject,
            "Email sent"
        );
        tracing::debug!("{}", email.text);
        Ok(())
    }
}
