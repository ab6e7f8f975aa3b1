//! Test doubles shared by unit and integration tests

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use crate::errors::NotificationError;
use crate::notify::{MailTransport, NotificationKind, OutgoingMessage, SmtpSettings};

/// Install a tracing subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("courier_server=debug"))
        .with_test_writer()
        .try_init();
}

/// Transport that records every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages recorded so far, in send order
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded messages of one kind
    pub fn count(&self, kind: NotificationKind) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.kind == kind)
            .count()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(
        &self,
        _settings: &SmtpSettings,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Transport whose server is always unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(
        &self,
        settings: &SmtpSettings,
        _message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Connection(format!(
            "connection to {}:{} refused",
            settings.server, settings.port
        )))
    }
}

/// SMTP settings suitable for tests that never reach a real server
pub fn test_smtp_settings() -> SmtpSettings {
    SmtpSettings {
        server: "smtp.example.com".into(),
        port: 587,
        user: "mailer".into(),
        password: "secret".into(),
        sender: "courier@example.com".into(),
    }
}
