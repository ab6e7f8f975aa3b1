//! Request and result types of the transfer service

use std::fmt;

use courier_common::Manifest;
use serde::Serialize;
use strum::Display;
use tokio::fs::File;

use crate::db::TransferRecord;
use crate::files::IncomingFile;
use crate::notify::NotificationWarning;

/// Service-wide settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Prefix of every download link
    pub base_url: String,
    /// Retention used when a request does not specify one
    pub default_retention_days: u32,
}

/// Files and addressing for one handoff
#[derive(Debug)]
pub struct IngestRequest {
    pub files: Vec<IncomingFile>,
    pub recipient_email: String,
    pub sender_email: String,
    /// `None` uses the configured default
    pub retention_days: Option<u32>,
}

/// Successful ingestion
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub transfer_id: String,
    pub artifact_name: String,
    pub fingerprint: String,
    pub download_link: String,
    pub expires_at: i64,
    /// Notifications that could not be delivered
    pub warnings: Vec<NotificationWarning>,
}

/// An artifact handed out for download
#[derive(Debug)]
pub struct Download {
    pub file: File,
    pub artifact_name: String,
    pub size: u64,
    pub fingerprint: String,
    /// True for the one download that flipped the transfer to delivered
    pub first_download: bool,
    /// Problems that did not prevent the download
    pub warnings: Vec<DownloadWarning>,
}

/// A problem reported next to a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadWarning {
    /// The delivered flag could not be stored; no notification was sent
    NotRecorded(String),
    /// The sender-downloaded notification failed
    Notification(NotificationWarning),
}

impl fmt::Display for DownloadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRecorded(message) => write!(f, "download was not recorded: {message}"),
            Self::Notification(warning) => warning.fmt(f),
        }
    }
}

/// Lifecycle state derived from a transfer's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferState {
    /// Downloadable and not yet fetched
    Active,
    /// Fetched at least once, still downloadable
    Delivered,
    /// Past expiry, waiting for the sweeper
    Expired,
}

/// Read-only view of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferStatus {
    pub transfer_id: String,
    pub artifact_name: String,
    pub recipient_email: String,
    pub sender_email: String,
    pub manifest: Manifest,
    pub total_size: u64,
    pub fingerprint: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub downloaded: bool,
    pub downloaded_at: Option<i64>,
    /// Expiry has passed; the sweeper may not have run yet
    pub expired: bool,
}

impl TransferStatus {
    pub(crate) fn from_record(record: TransferRecord, now: i64) -> Self {
        let expired = record.is_expired_at(now);
        Self {
            transfer_id: record.id,
            artifact_name: record.artifact_name,
            recipient_email: record.recipient_email,
            sender_email: record.sender_email,
            manifest: record.manifest,
            total_size: record.total_size,
            fingerprint: record.fingerprint,
            created_at: record.created_at,
            expires_at: record.expires_at,
            downloaded: record.downloaded,
            downloaded_at: record.downloaded_at,
            expired,
        }
    }

    /// Expiry wins over delivery
    #[must_use]
    pub fn state(&self) -> TransferState {
        if self.expired {
            TransferState::Expired
        } else if self.downloaded {
            TransferState::Delivered
        } else {
            TransferState::Active
        }
    }
}

/// Result of recomputing an artifact's fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub transfer_id: String,
    pub expected: String,
    pub actual: String,
}

impl VerifyReport {
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.expected == self.actual
    }
}
