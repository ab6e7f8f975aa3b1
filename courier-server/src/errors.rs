//! Error taxonomy for the transfer lifecycle
//!
//! `TransferError` is what every fallible service operation returns.
//! `NotificationError` never appears there: notification failures are
//! reported as warnings next to a successful result.

use std::fmt;
use std::io;

use courier_common::validators::{EmailError, FilePathError};
use thiserror::Error;

/// Bad or missing input, rejected before any side effect
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Zero files were supplied, or none of them had a usable name
    #[error("no usable files were supplied")]
    EmptyInput,

    #[error("invalid recipient email address ({0:?})")]
    RecipientEmail(EmailError),

    #[error("invalid sender email address ({0:?})")]
    SenderEmail(EmailError),

    #[error("retention must be between 1 and {max} days")]
    Retention { max: u32 },

    #[error("invalid file path ({0:?})")]
    FilePath(FilePathError),
}

/// Blob write/read failure in the storage area
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write staging data: {0}")]
    Staging(#[source] io::Error),

    #[error("failed to build archive: {0}")]
    Archive(#[source] io::Error),

    #[error("artifact already exists for transfer {0}")]
    Collision(String),

    #[error("failed to read artifact: {0}")]
    Read(#[source] io::Error),

    #[error("failed to delete artifact: {0}")]
    Delete(#[source] io::Error),
}

/// Transfer record store failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("transfer id {0} is already in use")]
    IdCollision(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt transfer record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("record task failed: {0}")]
    Task(String),
}

/// Why a transfer is not available
///
/// Only logged; callers see the same message for every reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No record with this id (never existed, or already swept)
    Unknown,
    /// Record exists but `expires_at` has passed
    Expired,
    /// Record exists but its blob is gone from disk
    MissingArtifact,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown transfer",
            Self::Expired => "transfer expired",
            Self::MissingArtifact => "artifact missing from storage",
        })
    }
}

/// Error returned by transfer service operations
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("transfer not available")]
    NotFound(NotFoundReason),
}

impl TransferError {
    /// The not-found reason, if this is a not-found error
    #[must_use]
    pub fn not_found_reason(&self) -> Option<NotFoundReason> {
        match self {
            Self::NotFound(reason) => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.not_found_reason() == Some(NotFoundReason::Expired)
    }
}

/// Stored SMTP configuration is missing, malformed, or unreadable
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// All problems found in one validation pass
    #[error("invalid SMTP configuration: {}", .problems.join(", "))]
    Invalid { problems: Vec<String> },

    #[error("SMTP configuration unavailable: {0}")]
    Unavailable(String),
}

/// Notification could not be rendered or delivered (never fatal)
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    #[error("SMTP connection failed: {0}")]
    Connection(String),

    #[error("message rejected by SMTP server: {0}")]
    Rejected(String),
}

/// Fatal startup failure while opening the database
#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("failed to create database directory: {0}")]
    CreateDir(#[source] io::Error),

    #[error("failed to connect after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
