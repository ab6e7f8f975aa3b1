//! Ingestion: files in, persisted transfer out

use chrono::{DateTime, Utc};
use courier_common::hash::compute_sha256;
use courier_common::time::retention_secs;
use tracing::info;

use super::TransferService;
use super::helpers::{
    check_retention, generate_transfer_id, recipient_address, sender_address,
};
use super::types::{IngestOutcome, IngestRequest};
use crate::db::TransferRecord;
use crate::errors::{PersistenceError, StorageError, TransferError, ValidationError};
use crate::files::{BlobGuard, assemble};
use crate::notify::TransferSummary;

impl TransferService {
    /// Ingest a set of files for one recipient
    ///
    /// Blob and record are created together or not at all. Notification
    /// failures are returned as warnings on a successful outcome.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, TransferError> {
        self.ingest_at(request, Utc::now()).await
    }

    /// `ingest` with an explicit clock
    pub async fn ingest_at(
        &self,
        request: IngestRequest,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, TransferError> {
        let recipient_email = recipient_address(&request.recipient_email)?;
        let sender_email = sender_address(&request.sender_email)?;
        let retention_days = check_retention(
            request
                .retention_days
                .unwrap_or(self.config.default_retention_days),
        )?;
        if request.files.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        let id = generate_transfer_id();
        let artifact = assemble(&self.storage, &id, request.files, now).await?;
        // Removed on every exit until the record exists
        let blob = BlobGuard::new(artifact.blob_path.clone());

        let fingerprint = compute_sha256(&artifact.blob_path)
            .await
            .map_err(StorageError::Read)?;

        let created_at = now.timestamp();
        let record = TransferRecord {
            id: id.clone(),
            artifact_name: artifact.artifact_name,
            recipient_email,
            sender_email,
            total_size: artifact.manifest.total_size(),
            manifest: artifact.manifest,
            fingerprint,
            created_at,
            expires_at: created_at + retention_secs(retention_days),
            downloaded: false,
            downloaded_at: None,
        };

        // Detached: the blob is kept exactly when the record is created, even
        // if the caller goes away mid-insert
        let db = self.db.clone();
        let stored = record.clone();
        tokio::spawn(async move {
            db.create(&stored).await?;
            blob.keep();
            Ok::<(), PersistenceError>(())
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))??;

        info!(
            transfer_id = %id,
            artifact = %record.artifact_name,
            files = record.manifest.len(),
            size = record.total_size,
            artifact_size = artifact.size,
            retention_days,
            "transfer ingested"
        );

        let download_link = self.download_link(&id);
        let summary = TransferSummary::from_record(&record, download_link.clone());
        let warnings = self.notifier.dispatch_ingested(&summary).await;

        Ok(IngestOutcome {
            transfer_id: id,
            artifact_name: record.artifact_name,
            fingerprint: record.fingerprint,
            download_link,
            expires_at: record.expires_at,
            warnings,
        })
    }
}
