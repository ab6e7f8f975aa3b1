//! Mail transport abstraction and its SMTP implementation

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::message::OutgoingMessage;
use super::settings::{ConnectionSecurity, SmtpSettings};
use crate::constants::SMTP_TIMEOUT_SECS;
use crate::errors::NotificationError;

/// Delivers one rendered message
///
/// Implementations open their own connection per call and release it on
/// every exit path.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        settings: &SmtpSettings,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError>;
}

/// SMTP delivery through `lettre`
///
/// Port 465 connects with implicit TLS; any other port starts in plaintext
/// and upgrades with STARTTLS before authenticating.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(
        &self,
        settings: &SmtpSettings,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        let email = build_email(settings, message)?;
        let transport = build_transport(settings)?;

        debug!(
            server = %settings.server,
            port = settings.port,
            security = ?settings.security(),
            kind = %message.kind,
            "sending notification"
        );

        // Dropping the transport after the send closes the connection
        transport.send(email).await.map_err(classify_smtp_error)?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address.parse().map_err(|e: lettre::address::AddressError| {
        NotificationError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })
}

fn build_email(
    settings: &SmtpSettings,
    message: &OutgoingMessage,
) -> Result<Message, NotificationError> {
    Message::builder()
        .from(parse_mailbox(&settings.sender)?)
        .to(parse_mailbox(&message.to)?)
        .subject(message.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))
        .map_err(|e| NotificationError::Message(e.to_string()))
}

fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
    let builder = match settings.security() {
        ConnectionSecurity::ImplicitTls => {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server)
        }
        ConnectionSecurity::StartTls => {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
        }
    }
    .map_err(|e| NotificationError::Connection(e.to_string()))?
    .port(settings.port)
    .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)));

    let builder = if settings.has_credentials() {
        builder.credentials(Credentials::new(
            settings.user.clone(),
            settings.password.clone(),
        ))
    } else {
        builder
    };

    Ok(builder.build())
}

/// Map a lettre error onto the notification taxonomy
///
/// 530/534/535 replies are authentication failures, other replies are
/// rejections. Errors without a reply code never reached an SMTP dialogue.
fn classify_smtp_error(error: lettre::transport::smtp::Error) -> NotificationError {
    match error.status() {
        Some(code) => classify_reply_code(&code.to_string(), error.to_string()),
        None => NotificationError::Connection(error.to_string()),
    }
}

fn classify_reply_code(code: &str, detail: String) -> NotificationError {
    match code {
        "530" | "534" | "535" => NotificationError::Authentication(detail),
        _ => NotificationError::Rejected(detail),
    }
}
