//! Typed SMTP settings and the source they are resolved from

use std::fmt;

use async_trait::async_trait;
use courier_common::validators::{normalize_email, validate_email};
use courier_common::{DEFAULT_SMTP_PORT, SMTP_IMPLICIT_TLS_PORT};

use crate::errors::ConfigurationError;

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSecurity {
    /// TLS from the first byte (port 465)
    ImplicitTls,
    /// Plaintext connection upgraded with STARTTLS before authentication
    StartTls,
}

impl ConnectionSecurity {
    /// Select the security mode for a port
    #[must_use]
    pub fn from_port(port: u16) -> Self {
        if port == SMTP_IMPLICIT_TLS_PORT {
            Self::ImplicitTls
        } else {
            Self::StartTls
        }
    }
}

/// Resolved, validated SMTP parameters
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Envelope and `From` address of every notification
    pub sender: String,
}

impl SmtpSettings {
    #[must_use]
    pub fn security(&self) -> ConnectionSecurity {
        ConnectionSecurity::from_port(self.port)
    }

    /// Whether the transport should authenticate
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty()
    }
}

// Password stays out of logs
impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .finish()
    }
}

/// SMTP parameters exactly as stored, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSmtpSettings {
    pub server: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub sender: String,
}

impl RawSmtpSettings {
    /// Validate every field and build `SmtpSettings`
    ///
    /// All problems are collected into a single `ConfigurationError::Invalid`.
    /// An empty port falls back to the submission port.
    pub fn resolve(self) -> Result<SmtpSettings, ConfigurationError> {
        let mut problems = Vec::new();

        let server = self.server.trim().to_string();
        if server.is_empty() {
            problems.push("server is not set".to_string());
        }

        let port_text = self.port.trim();
        let port = if port_text.is_empty() {
            DEFAULT_SMTP_PORT
        } else {
            match port_text.parse::<u16>() {
                Ok(0) | Err(_) => {
                    problems.push(format!("port {port_text:?} is not a valid TCP port"));
                    0
                }
                Ok(port) => port,
            }
        };

        let user = self.user.trim().to_string();
        if user.is_empty() != self.password.is_empty() {
            problems.push("user and password must be set together".to_string());
        }

        let sender = normalize_email(&self.sender);
        if let Err(e) = validate_email(&sender) {
            problems.push(format!("sender address is invalid ({e:?})"));
        }

        if !problems.is_empty() {
            return Err(ConfigurationError::Invalid { problems });
        }

        Ok(SmtpSettings {
            server,
            port,
            user,
            password: self.password,
            sender,
        })
    }
}

impl From<&SmtpSettings> for RawSmtpSettings {
    fn from(settings: &SmtpSettings) -> Self {
        Self {
            server: settings.server.clone(),
            port: settings.port.to_string(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            sender: settings.sender.clone(),
        }
    }
}

/// Where the dispatcher obtains SMTP settings
///
/// Consulted once per dispatch so configuration changes apply without a
/// restart.
#[async_trait]
pub trait SmtpSettingsSource: Send + Sync {
    async fn smtp_settings(&self) -> Result<SmtpSettings, ConfigurationError>;
}

#[async_trait]
impl SmtpSettingsSource for SmtpSettings {
    async fn smtp_settings(&self) -> Result<SmtpSettings, ConfigurationError> {
        Ok(self.clone())
    }
}
