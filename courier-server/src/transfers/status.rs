//! Read-only transfer queries

use courier_common::hash::compute_sha256;
use tracing::warn;

use super::TransferService;
use super::helpers::{check_transfer_id, now_secs};
use super::types::{TransferStatus, VerifyReport};
use crate::db::TransferRecord;
use crate::errors::{NotFoundReason, StorageError, TransferError};

impl TransferService {
    /// Current state of a transfer
    ///
    /// Expired transfers that have not been swept are still reported, with
    /// `expired` set.
    pub async fn status(&self, id: &str) -> Result<TransferStatus, TransferError> {
        let record = self.load(id).await?;
        Ok(TransferStatus::from_record(record, now_secs()))
    }

    /// Recompute the artifact fingerprint and compare it to the stored one
    ///
    /// The stored fingerprint is never updated.
    pub async fn verify(&self, id: &str) -> Result<VerifyReport, TransferError> {
        let record = self.load(id).await?;

        let blob_path = self.storage.blob_path(id);
        let actual = match compute_sha256(&blob_path).await {
            Ok(hash) => hash,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::NotFound(NotFoundReason::MissingArtifact));
            }
            Err(e) => return Err(StorageError::Read(e).into()),
        };

        let report = VerifyReport {
            transfer_id: record.id,
            expected: record.fingerprint,
            actual,
        };
        if !report.is_intact() {
            warn!(
                transfer_id = %id,
                expected = %report.expected,
                actual = %report.actual,
                "artifact fingerprint mismatch"
            );
        }
        Ok(report)
    }

    /// Most recent transfers, newest first
    pub async fn list(&self, limit: u32) -> Result<Vec<TransferStatus>, TransferError> {
        let now = now_secs();
        let records = self.db.list_recent(limit).await?;
        Ok(records
            .into_iter()
            .map(|record| TransferStatus::from_record(record, now))
            .collect())
    }

    async fn load(&self, id: &str) -> Result<TransferRecord, TransferError> {
        check_transfer_id(id)?;
        self.db
            .get(id)
            .await?
            .ok_or(TransferError::NotFound(NotFoundReason::Unknown))
    }
}
