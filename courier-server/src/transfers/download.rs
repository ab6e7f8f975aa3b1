//! Download gateway

use tracing::{info, warn};

use super::TransferService;
use super::helpers::{check_transfer_id, now_secs};
use super::types::{Download, DownloadWarning};
use crate::errors::{NotFoundReason, TransferError};
use crate::notify::{NotificationKind, TransferSummary};

impl TransferService {
    /// Hand out the artifact of a transfer
    ///
    /// Retrieval succeeds any number of times until expiry. The first
    /// successful call marks the transfer delivered and notifies the sender;
    /// later calls never notify again.
    pub async fn download(&self, id: &str) -> Result<Download, TransferError> {
        self.download_at(id, now_secs()).await
    }

    /// `download` with an explicit clock
    pub async fn download_at(&self, id: &str, now: i64) -> Result<Download, TransferError> {
        check_transfer_id(id)?;

        let Some(mut record) = self.db.get(id).await? else {
            info!(transfer_id = %id, reason = %NotFoundReason::Unknown, "download refused");
            return Err(TransferError::NotFound(NotFoundReason::Unknown));
        };

        // Time decides expiry, whether or not the blob is still on disk
        if record.is_expired_at(now) {
            info!(
                transfer_id = %id,
                reason = %NotFoundReason::Expired,
                expires_at = record.expires_at,
                "download refused"
            );
            return Err(TransferError::NotFound(NotFoundReason::Expired));
        }

        let Some((file, size)) = self.storage.open_blob(id).await? else {
            warn!(transfer_id = %id, reason = %NotFoundReason::MissingArtifact, "download refused");
            return Err(TransferError::NotFound(NotFoundReason::MissingArtifact));
        };

        let mut warnings = Vec::new();
        let first_download = match self.db.mark_downloaded_if_first(id, now).await {
            Ok(first) => first,
            Err(e) => {
                warn!(transfer_id = %id, error = %e, "failed to record download");
                warnings.push(DownloadWarning::NotRecorded(e.to_string()));
                false
            }
        };

        if first_download {
            record.downloaded = true;
            record.downloaded_at = Some(now);
            let summary = TransferSummary::from_record(&record, self.download_link(id));
            if let Some(warning) = self
                .notifier
                .dispatch(NotificationKind::SenderDownloaded, &summary)
                .await
            {
                warnings.push(DownloadWarning::Notification(warning));
            }
        }

        info!(transfer_id = %id, size, first_download, "download started");

        Ok(Download {
            file,
            artifact_name: record.artifact_name,
            size,
            fingerprint: record.fingerprint,
            first_download,
            warnings,
        })
    }
}
