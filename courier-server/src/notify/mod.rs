//! Notification dispatcher
//!
//! Renders a notification for a transfer, resolves SMTP settings, and hands
//! the message to a `MailTransport`. Failures never propagate as errors to
//! the transfer operations; they become `NotificationWarning`s.

mod message;
mod settings;
mod smtp;

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::NotificationError;

pub use message::{
    MessageContent, NotificationKind, OutgoingMessage, TransferSummary, format_timestamp,
};
pub use settings::{ConnectionSecurity, RawSmtpSettings, SmtpSettings, SmtpSettingsSource};
pub use smtp::{MailTransport, SmtpMailer};

/// A notification that could not be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationWarning {
    pub kind: NotificationKind,
    pub recipient: String,
    pub message: String,
}

impl NotificationWarning {
    fn new(kind: NotificationKind, recipient: &str, error: &NotificationError) -> Self {
        Self {
            kind,
            recipient: recipient.to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for NotificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notification to {} failed: {}",
            self.kind, self.recipient, self.message
        )
    }
}

/// Sends transfer notifications through a pluggable transport
#[derive(Clone)]
pub struct Notifier {
    settings: Arc<dyn SmtpSettingsSource>,
    transport: Arc<dyn MailTransport>,
}

impl Notifier {
    pub fn new(settings: Arc<dyn SmtpSettingsSource>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Render and send one notification
    pub async fn send(
        &self,
        kind: NotificationKind,
        summary: &TransferSummary,
    ) -> Result<(), NotificationError> {
        let settings = self.settings.smtp_settings().await?;
        let message = MessageContent::build(kind, summary).into_message(&summary.transfer_id);

        self.transport.send(&settings, &message).await?;

        info!(
            transfer_id = %summary.transfer_id,
            kind = %kind,
            to = %message.to,
            "notification sent"
        );
        Ok(())
    }

    /// Send one notification, converting a failure into a warning
    pub async fn dispatch(
        &self,
        kind: NotificationKind,
        summary: &TransferSummary,
    ) -> Option<NotificationWarning> {
        let recipient = match kind {
            NotificationKind::RecipientReceived => &summary.recipient_email,
            NotificationKind::SenderConfirmed | NotificationKind::SenderDownloaded => {
                &summary.sender_email
            }
        };

        match self.send(kind, summary).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    transfer_id = %summary.transfer_id,
                    kind = %kind,
                    to = %recipient,
                    error = %e,
                    "notification failed"
                );
                Some(NotificationWarning::new(kind, recipient, &e))
            }
        }
    }

    /// Send the two ingestion notifications concurrently
    pub async fn dispatch_ingested(&self, summary: &TransferSummary) -> Vec<NotificationWarning> {
        let (recipient, sender) = tokio::join!(
            self.dispatch(NotificationKind::RecipientReceived, summary),
            self.dispatch(NotificationKind::SenderConfirmed, summary),
        );
        recipient.into_iter().chain(sender).collect()
    }
}
